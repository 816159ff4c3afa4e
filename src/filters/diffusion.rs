use rayon::prelude::*;
use tracing::debug;

use super::{
    gaussian,
    grid::Grid,
    hessian::{Matrix3, ScaleRange, multiscale},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionParams {
    pub scales: ScaleRange,
    pub iterations: usize,
    /// Diffusivity along the vessel at full vesselness
    pub strength: f64,
    pub sensitivity: f64,
    pub time_step: f64,
    /// Diffusivity across the vessel at full vesselness
    pub epsilon: f64,
}

/// Diffusion tensor `Q diag(λ') Qᵀ` for one voxel. The first eigenvector
/// (smallest curvature) runs along the vessel.
fn tensor(vectors: &[[f64; 3]; 3], vesselness: f64, params: &DiffusionParams) -> Matrix3 {
    let response = if params.sensitivity > 0.0 {
        vesselness.max(0.0).powf(1.0 / params.sensitivity)
    } else {
        0.0
    };
    let along = 1.0 + (params.strength - 1.0) * response;
    let across = 1.0 + (params.epsilon - 1.0) * response;
    let lambdas = [along, across, across];
    let mut d = [[0.0; 3]; 3];
    for (k, vector) in vectors.iter().enumerate() {
        for i in 0..3 {
            for j in 0..3 {
                d[i][j] += lambdas[k] * vector[i] * vector[j];
            }
        }
    }
    d
}

/// Vessel enhancing diffusion. Each iteration recomputes the multi-scale
/// vesselness and takes one explicit step `u += dt * div(D grad u)`.
pub fn vessel_enhancing_diffusion(input: &[f64], grid: &Grid, params: &DiffusionParams) -> Vec<f64> {
    let mut u = input.to_vec();
    for iteration in 0..params.iterations {
        let response = multiscale(&u, grid, &params.scales);
        let tensors: Vec<Matrix3> = response
            .eigen
            .par_iter()
            .zip(&response.vesselness)
            .map(|(eigen, &v)| tensor(&eigen.vectors, v, params))
            .collect();

        let gradient: Vec<Vec<f64>> = (0..3).map(|axis| gaussian::derivative(&u, grid, axis)).collect();
        let flux: Vec<Vec<f64>> = (0..3)
            .map(|i| {
                (0..u.len())
                    .into_par_iter()
                    .map(|index| (0..3).map(|j| tensors[index][i][j] * gradient[j][index]).sum::<f64>())
                    .collect()
            })
            .collect();
        let divergence: Vec<Vec<f64>> = (0..3).map(|axis| gaussian::derivative(&flux[axis], grid, axis)).collect();

        u.par_iter_mut().enumerate().for_each(|(index, value)| {
            let div: f64 = divergence.iter().map(|d| d[index]).sum();
            *value += params.time_step * div;
        });
        debug!(iteration, "vessel enhancing diffusion step");
    }
    u
}
