use rayon::prelude::*;

use super::{
    gaussian,
    grid::{Grid, full_neighbourhood},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CannyParams {
    /// Gaussian variance per axis, physical units
    pub variance: Vec<f64>,
    pub upper: f64,
    pub lower: f64,
    pub max_error: Vec<f64>,
}

pub struct CannyMaps {
    /// 1 on edges, 0 elsewhere
    pub edges: Vec<f64>,
    /// Gradient magnitude after non-maximum suppression
    pub suppressed: Vec<f64>,
}

pub fn canny(input: &[f64], grid: &Grid, params: &CannyParams) -> CannyMaps {
    let smoothed = gaussian::smooth(input, grid, &params.variance, &params.max_error);
    let gradient: Vec<Vec<f64>> = (0..grid.rank())
        .map(|axis| gaussian::derivative(&smoothed, grid, axis))
        .collect();
    let magnitude: Vec<f64> = (0..input.len())
        .into_par_iter()
        .map(|i| gradient.iter().map(|g| g[i] * g[i]).sum::<f64>().sqrt())
        .collect();

    let suppressed: Vec<f64> = (0..input.len())
        .into_par_iter()
        .map(|index| {
            let m = magnitude[index];
            if m <= 0.0 {
                return 0.0;
            }
            let direction: Vec<isize> = gradient.iter().map(|g| (g[index] / m).round() as isize).collect();
            let back: Vec<isize> = direction.iter().map(|d| -d).collect();
            let coords = grid.coords(index);
            let sample = |delta: &[isize]| grid.shifted(&coords, delta).map_or(0.0, |n| magnitude[n]);
            if m >= sample(&direction) && m >= sample(&back) { m } else { 0.0 }
        })
        .collect();

    let edges = hysteresis(&suppressed, grid, params.upper, params.lower);
    CannyMaps { edges, suppressed }
}

/// Keeps suppressed maxima at or above `upper`, and those at or above
/// `lower` connected to them through the full neighbourhood.
fn hysteresis(suppressed: &[f64], grid: &Grid, upper: f64, lower: f64) -> Vec<f64> {
    let neighbourhood = full_neighbourhood(grid.rank());
    let mut edges = vec![0.0; suppressed.len()];
    let mut stack: Vec<usize> = suppressed
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m > 0.0 && m >= upper)
        .map(|(i, _)| i)
        .collect();
    for &seed in &stack {
        edges[seed] = 1.0;
    }
    while let Some(index) = stack.pop() {
        let coords = grid.coords(index);
        for offset in &neighbourhood {
            let Some(neighbour) = grid.shifted(&coords, offset) else {
                continue;
            };
            let m = suppressed[neighbour];
            if edges[neighbour] == 0.0 && m > 0.0 && m >= lower {
                edges[neighbour] = 1.0;
                stack.push(neighbour);
            }
        }
    }
    edges
}
