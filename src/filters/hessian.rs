//! Multi-scale Hessian vesselness for 3D images.
//!
//! Each scale smooths the image with a Gaussian of standard deviation σ in
//! physical units, takes σ²-normalised second derivatives, and scores every
//! voxel with the Frangi measure for bright tubular structures. The response
//! is the maximum over scales.

use rayon::prelude::*;
use tracing::debug;

use super::{gaussian, grid::Grid};

const ALPHA: f64 = 0.5;
const BETA: f64 = 0.5;
const GAMMA: f64 = 5.0;

const SMOOTHING_ERROR: f64 = 0.01;
const JACOBI_SWEEPS: usize = 50;

pub type Matrix3 = [[f64; 3]; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRange {
    pub sigma_min: f64,
    pub sigma_max: f64,
    pub steps: usize,
    pub logarithmic: bool,
}

impl ScaleRange {
    /// Scales from `sigma_min` to `sigma_max` inclusive. Fewer than two steps
    /// or an empty range gives `sigma_min` alone.
    pub fn sigmas(&self) -> Vec<f64> {
        if self.steps < 2 || self.sigma_max <= self.sigma_min {
            return vec![self.sigma_min];
        }
        let last = (self.steps - 1) as f64;
        (0..self.steps)
            .map(|i| {
                let t = i as f64 / last;
                if self.logarithmic {
                    (self.sigma_min.ln() + t * (self.sigma_max.ln() - self.sigma_min.ln())).exp()
                } else {
                    self.sigma_min + t * (self.sigma_max - self.sigma_min)
                }
            })
            .collect()
    }
}

/// Eigen-decomposition of one voxel's Hessian. Values are ordered by
/// increasing magnitude and `vectors[k]` belongs to `values[k]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigen {
    pub values: [f64; 3],
    pub vectors: [[f64; 3]; 3],
}

/// Cyclic Jacobi rotations on a symmetric 3x3 matrix.
pub fn symmetric_eigen(matrix: Matrix3) -> Eigen {
    let mut a = matrix;
    let mut v: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    for _ in 0..JACOBI_SWEEPS {
        let off = a[0][1].powi(2) + a[0][2].powi(2) + a[1][2].powi(2);
        if off < 1e-30 {
            break;
        }
        for (p, q) in [(0, 1), (0, 2), (1, 2)] {
            if a[p][q].abs() < 1e-300 {
                continue;
            }
            let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;
            for k in 0..3 {
                let akp = a[k][p];
                let akq = a[k][q];
                a[k][p] = c * akp - s * akq;
                a[k][q] = s * akp + c * akq;
            }
            for k in 0..3 {
                let apk = a[p][k];
                let aqk = a[q][k];
                a[p][k] = c * apk - s * aqk;
                a[q][k] = s * apk + c * aqk;
            }
            for row in v.iter_mut() {
                let vkp = row[p];
                let vkq = row[q];
                row[p] = c * vkp - s * vkq;
                row[q] = s * vkp + c * vkq;
            }
        }
    }

    let mut order = [0, 1, 2];
    order.sort_by(|&i, &j| a[i][i].abs().total_cmp(&a[j][j].abs()));
    Eigen {
        values: order.map(|k| a[k][k]),
        vectors: order.map(|k| [v[0][k], v[1][k], v[2][k]]),
    }
}

/// Frangi vesselness of bright tubes from magnitude-ordered eigenvalues
pub fn frangi(values: [f64; 3]) -> f64 {
    let [l1, l2, l3] = values;
    if l2 >= 0.0 || l3 >= 0.0 {
        return 0.0;
    }
    let ra = l2.abs() / l3.abs();
    let rb = l1.abs() / (l2 * l3).abs().sqrt();
    let s2 = l1 * l1 + l2 * l2 + l3 * l3;
    (1.0 - (-ra * ra / (2.0 * ALPHA * ALPHA)).exp())
        * (-rb * rb / (2.0 * BETA * BETA)).exp()
        * (1.0 - (-s2 / (2.0 * GAMMA * GAMMA)).exp())
}

/// σ²-normalised Hessian of the image smoothed at scale `sigma`
pub fn hessian(data: &[f64], grid: &Grid, sigma: f64) -> Vec<Matrix3> {
    let variance = vec![sigma * sigma; 3];
    let smoothed = gaussian::smooth(data, grid, &variance, &[SMOOTHING_ERROR; 3]);
    let first: Vec<Vec<f64>> = (0..3).map(|axis| gaussian::derivative(&smoothed, grid, axis)).collect();
    let mut second: [[Vec<f64>; 3]; 3] = Default::default();
    for i in 0..3 {
        for j in i..3 {
            second[i][j] = gaussian::derivative(&first[i], grid, j);
        }
    }
    let norm = sigma * sigma;
    (0..data.len())
        .into_par_iter()
        .map(|index| {
            let mut h = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in i..3 {
                    h[i][j] = norm * second[i][j][index];
                    h[j][i] = h[i][j];
                }
            }
            h
        })
        .collect()
}

/// Per-voxel response at the best scale together with that scale's
/// eigen-decomposition.
pub struct ScaleResponse {
    pub vesselness: Vec<f64>,
    pub eigen: Vec<Eigen>,
}

pub fn multiscale(data: &[f64], grid: &Grid, scales: &ScaleRange) -> ScaleResponse {
    let identity = Eigen {
        values: [0.0; 3],
        vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };
    let mut best = ScaleResponse {
        vesselness: vec![0.0; data.len()],
        eigen: vec![identity; data.len()],
    };
    for sigma in scales.sigmas() {
        let hessians = hessian(data, grid, sigma);
        let scored: Vec<(f64, Eigen)> = hessians
            .into_par_iter()
            .map(|h| {
                let eigen = symmetric_eigen(h);
                (frangi(eigen.values), eigen)
            })
            .collect();
        for (index, (v, eigen)) in scored.into_iter().enumerate() {
            if v > best.vesselness[index] {
                best.vesselness[index] = v;
                best.eigen[index] = eigen;
            }
        }
        debug!(sigma, "vesselness scale done");
    }
    best
}

pub fn vesselness(data: &[f64], grid: &Grid, scales: &ScaleRange) -> Vec<f64> {
    multiscale(data, grid, scales).vesselness
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_steps() {
        let log = ScaleRange { sigma_min: 1.0, sigma_max: 4.0, steps: 3, logarithmic: true };
        let sigmas = log.sigmas();
        assert!((sigmas[1] - 2.0).abs() < 1e-12);
        assert!((sigmas[2] - 4.0).abs() < 1e-12);
        let linear = ScaleRange { logarithmic: false, ..log };
        assert!((linear.sigmas()[1] - 2.5).abs() < 1e-12);
        assert_eq!(ScaleRange { steps: 1, ..log }.sigmas(), vec![1.0]);
    }

    #[test]
    fn jacobi_recovers_known_eigenpairs() {
        let m = [[2.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, -5.0]];
        let eigen = symmetric_eigen(m);
        let expected = [1.0, 3.0, -5.0];
        for k in 0..3 {
            assert!((eigen.values[k] - expected[k]).abs() < 1e-10);
            let v = eigen.vectors[k];
            for row in 0..3 {
                let mv: f64 = (0..3).map(|c| m[row][c] * v[c]).sum();
                assert!((mv - eigen.values[k] * v[row]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn frangi_prefers_bright_tubes() {
        assert_eq!(frangi([0.0, 1.0, -4.0]), 0.0);
        let tube = frangi([0.0, -10.0, -10.0]);
        let blob = frangi([-10.0, -10.0, -10.0]);
        let plate = frangi([0.0, -0.1, -10.0]);
        assert!(tube > blob);
        assert!(tube > plate);
        assert!(tube > 0.5);
    }

    #[test]
    fn a_bright_line_scores_highest_on_its_axis() {
        let grid = Grid::unit(&[9, 9, 9]);
        let data: Vec<f64> = (0..grid.len())
            .map(|i| {
                let c = grid.coords(i);
                let r2 = (c[1] as f64 - 4.0).powi(2) + (c[2] as f64 - 4.0).powi(2);
                100.0 * (-r2 / 2.0).exp()
            })
            .collect();
        let scales = ScaleRange { sigma_min: 1.0, sigma_max: 2.0, steps: 2, logarithmic: true };
        let v = vesselness(&data, &grid, &scales);
        let centre = v[grid.index(&[4, 4, 4])];
        assert!(centre > 0.0);
        assert!(centre > v[grid.index(&[4, 0, 0])]);
        assert!(centre >= v[grid.index(&[4, 4, 6])]);
    }
}
