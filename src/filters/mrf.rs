use tracing::debug;

use super::grid::{Grid, Offset, box_offsets};

#[derive(Debug, Clone, PartialEq)]
pub struct MrfParams {
    pub centroids: Vec<f64>,
    /// Neighbourhood weights in row-major order over the box of `half_size`
    pub weights: Vec<f64>,
    pub half_size: Vec<usize>,
    pub smoothing: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

/// Rescales the neighbourhood weights against the class centroids:
/// `w * mean(mu) / (2 * sum(w))`. Weights summing to zero are left as given.
pub fn scale_weights(weights: &[f64], centroids: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total == 0.0 || centroids.is_empty() {
        return weights.to_vec();
    }
    let mean_distance = centroids.iter().sum::<f64>() / centroids.len() as f64;
    weights.iter().map(|w| w * mean_distance / (2.0 * total)).collect()
}

fn nearest_class(value: f64, centroids: &[f64]) -> u8 {
    let mut best = 0;
    for (k, mu) in centroids.iter().enumerate() {
        if (value - mu).abs() < (value - centroids[best]).abs() {
            best = k;
        }
    }
    best as u8
}

/// Markov random field labelling by iterated conditional modes. Labels are
/// 0-based indices into `centroids`, which must hold between 1 and 256
/// classes.
pub fn classify(input: &[f64], grid: &Grid, params: &MrfParams) -> Vec<u8> {
    let mut labels: Vec<u8> = input.iter().map(|&v| nearest_class(v, &params.centroids)).collect();
    let weights = scale_weights(&params.weights, &params.centroids);
    let neighbourhood: Vec<(Offset, f64)> = box_offsets(&params.half_size)
        .into_iter()
        .zip(weights)
        .filter(|(_, w)| *w != 0.0)
        .collect();

    let classes = params.centroids.len();
    let mut votes = vec![0.0; classes];
    for iteration in 0..params.max_iterations {
        let mut changed = 0usize;
        for index in 0..input.len() {
            let coords = grid.coords(index);
            votes.iter_mut().for_each(|v| *v = 0.0);
            for (offset, weight) in &neighbourhood {
                if let Some(neighbour) = grid.shifted(&coords, offset) {
                    votes[labels[neighbour] as usize] += weight;
                }
            }
            let mut best = labels[index] as usize;
            let mut best_score = f64::INFINITY;
            for (k, mu) in params.centroids.iter().enumerate() {
                let score = (input[index] - mu).abs() - params.smoothing * votes[k];
                if score < best_score {
                    best_score = score;
                    best = k;
                }
            }
            if best != labels[index] as usize {
                labels[index] = best as u8;
                changed += 1;
            }
        }
        let fraction = changed as f64 / input.len().max(1) as f64;
        debug!(iteration, changed, fraction, "mrf sweep");
        if changed == 0 || fraction < params.tolerance {
            break;
        }
    }
    labels
}
