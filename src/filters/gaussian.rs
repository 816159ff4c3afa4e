use rayon::prelude::*;

use super::grid::Grid;

/// Widest half-kernel in voxels
const MAX_HALF_WIDTH: usize = 32;

/// Sampled, normalised Gaussian of `variance` (in voxel units squared),
/// truncated where the discarded tail mass drops to `max_error`.
pub fn kernel(variance: f64, max_error: f64) -> Vec<f64> {
    if variance.is_nan() || variance <= 0.0 {
        return vec![1.0];
    }
    let half: Vec<f64> = (0..=MAX_HALF_WIDTH)
        .map(|k| (-((k * k) as f64) / (2.0 * variance)).exp())
        .collect();
    let total = half[0] + 2.0 * half[1..].iter().sum::<f64>();
    let tolerance = max_error.clamp(0.0, 1.0);

    let mut radius = 0;
    let mut mass = half[0];
    while radius < MAX_HALF_WIDTH && 1.0 - mass / total > tolerance {
        radius += 1;
        mass += 2.0 * half[radius];
    }

    let mut weights: Vec<f64> = (0..=2 * radius)
        .map(|i| half[i.abs_diff(radius)])
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= sum);
    weights
}

/// Convolves along one axis with a replicated border.
pub fn convolve_axis(data: &[f64], grid: &Grid, axis: usize, weights: &[f64]) -> Vec<f64> {
    if weights.len() <= 1 {
        return data.to_vec();
    }
    let radius = (weights.len() / 2) as isize;
    let extent = grid.shape()[axis] as isize;
    let stride = grid.stride(axis);
    (0..data.len())
        .into_par_iter()
        .map(|index| {
            let position = ((index / stride) as isize) % extent;
            let line_start = index - position as usize * stride;
            weights
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let q = (position + k as isize - radius).clamp(0, extent - 1);
                    w * data[line_start + q as usize * stride]
                })
                .sum::<f64>()
        })
        .collect()
}

/// Separable smoothing with a per-axis variance in physical units.
pub fn smooth(data: &[f64], grid: &Grid, variance: &[f64], max_error: &[f64]) -> Vec<f64> {
    let mut out = data.to_vec();
    for axis in 0..grid.rank() {
        let spacing = grid.spacing()[axis];
        let weights = kernel(variance[axis] / (spacing * spacing), max_error[axis]);
        out = convolve_axis(&out, grid, axis, &weights);
    }
    out
}

/// Central difference along `axis` in physical units, one-sided at the border.
pub fn derivative(data: &[f64], grid: &Grid, axis: usize) -> Vec<f64> {
    let extent = grid.shape()[axis];
    let stride = grid.stride(axis);
    let spacing = grid.spacing()[axis];
    if extent < 2 {
        return vec![0.0; data.len()];
    }
    (0..data.len())
        .into_par_iter()
        .map(|index| {
            let position = (index / stride) % extent;
            let back = if position > 0 { index - stride } else { index };
            let ahead = if position + 1 < extent { index + stride } else { index };
            let span = ((ahead - back) / stride) as f64 * spacing;
            (data[ahead] - data[back]) / span
        })
        .collect()
}
