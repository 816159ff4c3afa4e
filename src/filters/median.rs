use std::cmp::Ordering;

use rayon::prelude::*;

use crate::pixel::Pixel;

use super::grid::{Grid, box_offsets};

/// Median over the box `[-r_i, r_i]` with a replicated border.
pub fn median<T: Pixel>(input: &[T], grid: &Grid, radius: &[usize]) -> Vec<T> {
    if radius.iter().all(|&r| r == 0) {
        return input.to_vec();
    }
    let window = box_offsets(radius);
    let middle = window.len() / 2;
    (0..input.len())
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(window.len()),
            |values, index| {
                let coords = grid.coords(index);
                values.clear();
                values.extend(window.iter().map(|offset| input[grid.shifted_clamped(&coords, offset)]));
                let (_, median, _) = values
                    .select_nth_unstable_by(middle, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                *median
            },
        )
        .collect()
}
