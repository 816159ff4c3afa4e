use tracing::debug;

use crate::pixel::Pixel;

use super::grid::{Grid, box_offsets};

#[derive(Debug, Clone, Copy)]
pub struct VotingParams<T> {
    pub max_iterations: usize,
    pub majority_threshold: usize,
    pub background: T,
    pub foreground: T,
}

/// Iterative voting hole filling. A background voxel turns foreground when
/// at least `(box - 1) / 2 + majority_threshold` of its box neighbours are
/// foreground. Iterations stop early once nothing changes.
pub fn voting_hole_fill<T: Pixel>(
    input: &[T],
    grid: &Grid,
    radius: &[usize],
    params: VotingParams<T>,
) -> Vec<T> {
    let window: Vec<_> = box_offsets(radius)
        .into_iter()
        .filter(|offset| offset.iter().any(|&d| d != 0))
        .collect();
    let birth = window.len() / 2 + params.majority_threshold;

    let mut current = input.to_vec();
    for iteration in 0..params.max_iterations {
        let mut next = current.clone();
        let mut changed = 0usize;
        for (index, &value) in current.iter().enumerate() {
            if value != params.background {
                continue;
            }
            let coords = grid.coords(index);
            let votes = window
                .iter()
                .filter(|offset| current[grid.shifted_clamped(&coords, offset)] == params.foreground)
                .count();
            if votes >= birth {
                next[index] = params.foreground;
                changed += 1;
            }
        }
        current = next;
        debug!(iteration, changed, "voting hole fill pass");
        if changed == 0 {
            break;
        }
    }
    current
}
