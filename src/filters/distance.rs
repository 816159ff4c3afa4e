//! Distance maps: Danielsson vector propagation, exact signed Euclidean
//! distance to the object contour, and the chamfer approximation seeded at
//! the half-level iso-contour.

use tracing::warn;

use crate::pixel::Pixel;

use super::grid::{Grid, face_neighbours, full_neighbourhood};

/// Outputs of the Danielsson filters. `offsets` holds one block of `len`
/// components per axis, each the step from the voxel to its source.
#[derive(Debug, Clone, PartialEq)]
pub struct DanielssonMaps<T> {
    pub distance: Vec<f64>,
    pub voronoi: Vec<T>,
    pub offsets: Vec<i64>,
}

/// Nearest seed of every voxel by repeated forward and backward raster
/// sweeps over the full neighbourhood. Distances are in index units.
fn propagate_nearest(grid: &Grid, seeds: &[bool]) -> Vec<Option<usize>> {
    let n = grid.len();
    let mut nearest: Vec<Option<usize>> = seeds.iter().enumerate().map(|(i, &s)| s.then_some(i)).collect();
    if !seeds.iter().any(|&s| s) {
        return nearest;
    }
    let unit = Grid::unit(grid.shape());
    let neighbourhood = full_neighbourhood(grid.rank());
    let mut best: Vec<f64> = nearest.iter().map(|s| if s.is_some() { 0.0 } else { f64::INFINITY }).collect();
    let mut here = vec![0; grid.rank()];
    let mut there = vec![0; grid.rank()];

    let mut relax = |index: usize, nearest: &mut [Option<usize>], best: &mut [f64]| -> bool {
        unit.fill_coords(index, &mut here);
        let mut changed = false;
        for offset in &neighbourhood {
            let Some(neighbour) = unit.shifted(&here, offset) else {
                continue;
            };
            let Some(source) = nearest[neighbour] else {
                continue;
            };
            unit.fill_coords(source, &mut there);
            let d = unit.distance_squared(&here, &there);
            if d < best[index] {
                best[index] = d;
                nearest[index] = Some(source);
                changed = true;
            }
        }
        changed
    };

    loop {
        let mut changed = false;
        for index in 0..n {
            changed |= relax(index, &mut nearest, &mut best);
        }
        for index in (0..n).rev() {
            changed |= relax(index, &mut nearest, &mut best);
        }
        if !changed {
            break;
        }
    }
    nearest
}

fn fill_source<T: Pixel>(
    grid: &Grid,
    input: &[T],
    index: usize,
    source: Option<usize>,
    maps: &mut DanielssonMaps<T>,
) -> f64 {
    let n = grid.len();
    let Some(source) = source else {
        return f64::INFINITY;
    };
    maps.voronoi[index] = input[source];
    let mut squared = 0;
    for axis in 0..grid.rank() {
        let step = grid.axis_coord(source, axis) as i64 - grid.axis_coord(index, axis) as i64;
        maps.offsets[axis * n + index] = step;
        squared += step * step;
    }
    (squared as f64).sqrt()
}

fn empty_maps<T: Pixel>(grid: &Grid) -> DanielssonMaps<T> {
    DanielssonMaps {
        distance: vec![0.0; grid.len()],
        voronoi: vec![T::default(); grid.len()],
        offsets: vec![0; grid.len() * grid.rank()],
    }
}

/// Unsigned distance to the nearest non-zero voxel.
pub fn danielsson<T: Pixel>(input: &[T], grid: &Grid) -> DanielssonMaps<T> {
    let seeds: Vec<bool> = input.iter().map(|v| v.is_foreground()).collect();
    if !seeds.contains(&true) {
        warn!("distance map of an image without foreground");
    }
    let nearest = propagate_nearest(grid, &seeds);
    let mut maps = empty_maps(grid);
    for index in 0..input.len() {
        let distance = fill_source(grid, input, index, nearest[index], &mut maps);
        maps.distance[index] = distance;
    }
    maps
}

/// Signed variant: positive outside the object (distance to the nearest
/// foreground voxel), negative inside (distance to the nearest background
/// voxel). Voronoi values and offsets refer to the voxel measured to.
pub fn signed_danielsson<T: Pixel>(input: &[T], grid: &Grid) -> DanielssonMaps<T> {
    let inside: Vec<bool> = input.iter().map(|v| v.is_foreground()).collect();
    let outside: Vec<bool> = inside.iter().map(|&v| !v).collect();
    if !inside.contains(&true) || !outside.contains(&true) {
        warn!("signed distance map of a uniform image");
    }
    let to_object = propagate_nearest(grid, &inside);
    let to_background = propagate_nearest(grid, &outside);
    let mut maps = empty_maps(grid);
    for index in 0..input.len() {
        let distance = if inside[index] {
            -fill_source(grid, input, index, to_background[index], &mut maps)
        } else {
            fill_source(grid, input, index, to_object[index], &mut maps)
        };
        maps.distance[index] = distance;
    }
    maps
}

/// One-dimensional squared distance transform of sampled function `f` on a
/// line with sample spacing `step` (lower envelope of parabolas).
fn lower_envelope(f: &[f64], step: f64) -> Vec<f64> {
    let n = f.len();
    let mut vertices: Vec<usize> = Vec::with_capacity(n);
    let mut bounds: Vec<f64> = Vec::with_capacity(n + 1);
    for q in (0..n).filter(|&q| f[q].is_finite()) {
        let xq = q as f64 * step;
        loop {
            let Some(&p) = vertices.last() else {
                vertices.push(q);
                bounds.push(f64::NEG_INFINITY);
                break;
            };
            let xp = p as f64 * step;
            let cross = ((f[q] + xq * xq) - (f[p] + xp * xp)) / (2.0 * (xq - xp));
            if bounds.last().is_some_and(|&b| cross <= b) && vertices.len() > 1 {
                vertices.pop();
                bounds.pop();
            } else {
                vertices.push(q);
                bounds.push(cross);
                break;
            }
        }
    }
    if vertices.is_empty() {
        return vec![f64::INFINITY; n];
    }
    bounds.push(f64::INFINITY);

    let mut k = 0;
    (0..n)
        .map(|q| {
            let x = q as f64 * step;
            while bounds[k + 1] < x {
                k += 1;
            }
            let xv = vertices[k] as f64 * step;
            (x - xv).powi(2) + f[vertices[k]]
        })
        .collect()
}

/// Exact squared Euclidean distance in physical units to the nearest seed.
fn squared_edt(grid: &Grid, seeds: &[bool]) -> Vec<f64> {
    let mut field: Vec<f64> = seeds.iter().map(|&s| if s { 0.0 } else { f64::INFINITY }).collect();
    for axis in 0..grid.rank() {
        let extent = grid.shape()[axis];
        let stride = grid.stride(axis);
        let step = grid.spacing()[axis];
        for start in 0..grid.len() {
            if (start / stride) % extent != 0 {
                continue;
            }
            let line: Vec<f64> = (0..extent).map(|q| field[start + q * stride]).collect();
            for (q, value) in lower_envelope(&line, step).into_iter().enumerate() {
                field[start + q * stride] = value;
            }
        }
    }
    field
}

/// Foreground voxels with a face neighbour inside the image that is not
/// foreground
fn contour(grid: &Grid, inside: &[bool]) -> Vec<bool> {
    let faces = face_neighbours(grid.rank());
    let mut coords = vec![0; grid.rank()];
    (0..grid.len())
        .map(|index| {
            inside[index] && {
                grid.fill_coords(index, &mut coords);
                faces.iter().any(|offset| {
                    grid.shifted(&coords, offset).is_some_and(|n| !inside[n])
                })
            }
        })
        .collect()
}

/// Signed exact Euclidean distance to the object contour: zero on the
/// contour, negative inside, positive outside. Without foreground the map
/// is `+inf`; without a contour (all foreground) it is `-inf`.
pub fn signed_maurer<T: Pixel>(input: &[T], grid: &Grid) -> Vec<f64> {
    let inside: Vec<bool> = input.iter().map(|v| v.is_foreground()).collect();
    let edge = contour(grid, &inside);
    if !edge.contains(&true) {
        let all_inside = inside.contains(&true);
        warn!(all_inside, "signed Maurer distance of an image without contour");
        let fill = if all_inside { f64::NEG_INFINITY } else { f64::INFINITY };
        return vec![fill; input.len()];
    }
    squared_edt(grid, &edge)
        .into_iter()
        .zip(&inside)
        .map(|(d, &is_inside)| if is_inside { -d.sqrt() } else { d.sqrt() })
        .collect()
}

/// Chamfer approximation of the signed distance to the 0.5 iso-level.
/// Voxels above 0.5 are inside and get negative values.
pub fn approximate_signed<T: Pixel>(input: &[T], grid: &Grid) -> Vec<f64> {
    let inside: Vec<bool> = input.iter().map(|v| v.to_f64() > 0.5).collect();
    let n = grid.len();
    let faces = face_neighbours(grid.rank());

    let mut coords = vec![0; grid.rank()];
    let mut magnitude = vec![f64::INFINITY; n];
    for (index, slot) in magnitude.iter_mut().enumerate() {
        grid.fill_coords(index, &mut coords);
        for offset in &faces {
            if let Some(neighbour) = grid.shifted(&coords, offset) {
                if inside[neighbour] != inside[index] {
                    *slot = slot.min(0.5 * grid.length(offset));
                }
            }
        }
    }
    if magnitude.iter().all(|d| d.is_infinite()) {
        warn!("approximate distance map of an image without iso-contour");
        let fill = if inside.first().copied().unwrap_or(false) { f64::NEG_INFINITY } else { f64::INFINITY };
        return vec![fill; n];
    }

    let neighbourhood: Vec<_> = full_neighbourhood(grid.rank())
        .into_iter()
        .map(|offset| {
            let weight = grid.length(&offset);
            (offset, weight)
        })
        .collect();
    let mut relax = |index: usize, magnitude: &mut [f64]| -> bool {
        grid.fill_coords(index, &mut coords);
        let mut changed = false;
        for (offset, weight) in &neighbourhood {
            if let Some(neighbour) = grid.shifted(&coords, offset) {
                let candidate = magnitude[neighbour] + weight;
                if candidate < magnitude[index] {
                    magnitude[index] = candidate;
                    changed = true;
                }
            }
        }
        changed
    };
    loop {
        let mut changed = false;
        for index in 0..n {
            changed |= relax(index, &mut magnitude);
        }
        for index in (0..n).rev() {
            changed |= relax(index, &mut magnitude);
        }
        if !changed {
            break;
        }
    }

    magnitude
        .into_iter()
        .zip(&inside)
        .map(|(d, &is_inside)| if is_inside { -d } else { d })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(shape: &[usize], at: &[usize]) -> (Grid, Vec<u8>) {
        let grid = Grid::unit(shape);
        let mut data = vec![0u8; grid.len()];
        data[grid.index(at)] = 5;
        (grid, data)
    }

    #[test]
    fn danielsson_measures_to_the_single_seed() {
        let (grid, data) = point(&[5, 6], &[1, 2]);
        let maps = danielsson(&data, &grid);
        for index in 0..grid.len() {
            let c = grid.coords(index);
            let expected = ((c[0] as f64 - 1.0).powi(2) + (c[1] as f64 - 2.0).powi(2)).sqrt();
            assert!((maps.distance[index] - expected).abs() < 1e-12);
            assert_eq!(maps.voronoi[index], 5);
            assert_eq!(maps.offsets[index], 1 - c[0] as i64);
            assert_eq!(maps.offsets[grid.len() + index], 2 - c[1] as i64);
        }
    }

    #[test]
    fn danielsson_in_3d_finds_the_closer_of_two_seeds() {
        let grid = Grid::unit(&[6, 7, 5]);
        let seeds = [([0, 1, 0], 3u16), ([5, 6, 4], 9u16)];
        let mut data = vec![0u16; grid.len()];
        for (at, value) in seeds {
            data[grid.index(&at)] = value;
        }
        let maps = danielsson(&data, &grid);
        for index in 0..grid.len() {
            let c = grid.coords(index);
            let d: Vec<f64> = seeds
                .iter()
                .map(|(at, _)| grid.distance_squared(&c, at).sqrt())
                .collect();
            assert!((maps.distance[index] - d[0].min(d[1])).abs() < 1e-12, "voxel {c:?}");
            if d[0] != d[1] {
                let expected = if d[0] < d[1] { 3 } else { 9 };
                assert_eq!(maps.voronoi[index], expected, "voxel {c:?}");
            }
        }
    }

    #[test]
    fn danielsson_without_foreground_is_infinite() {
        let grid = Grid::unit(&[3, 3]);
        let maps = danielsson(&[0i32; 9], &grid);
        assert!(maps.distance.iter().all(|d| *d == f64::INFINITY));
        assert!(maps.offsets.iter().all(|&o| o == 0));
    }

    #[test]
    fn signed_danielsson_is_negative_inside() {
        let grid = Grid::unit(&[1, 7]);
        let data = [0, 0, 1, 1, 1, 0, 0];
        let maps = signed_danielsson(&data, &grid);
        assert_eq!(maps.distance, vec![2.0, 1.0, -1.0, -2.0, -1.0, 1.0, 2.0]);
        assert_eq!(maps.voronoi[0], 1);
        assert_eq!(maps.voronoi[3], 0);
    }

    #[test]
    fn lower_envelope_matches_brute_force() {
        let f = [f64::INFINITY, 0.0, f64::INFINITY, f64::INFINITY, 1.0, f64::INFINITY];
        let out = lower_envelope(&f, 2.0);
        for (q, value) in out.iter().enumerate() {
            let brute = f
                .iter()
                .enumerate()
                .map(|(p, fp)| ((q as f64 - p as f64) * 2.0).powi(2) + fp)
                .fold(f64::INFINITY, f64::min);
            assert_eq!(*value, brute, "sample {q}");
        }
    }

    #[test]
    fn maurer_is_zero_on_the_contour_and_uses_spacing() {
        let grid = Grid::new(&[1, 9], &[1.0, 0.5]);
        let data = [0, 0, 0, 1, 1, 1, 1, 1, 0];
        let out = signed_maurer(&data, &grid);
        assert_eq!(out[3], 0.0);
        assert_eq!(out[7], 0.0);
        assert_eq!(out[5], -1.0);
        assert_eq!(out[0], 1.5);
        assert_eq!(out[8], 0.5);
    }

    #[test]
    fn maurer_degenerate_inputs() {
        let grid = Grid::unit(&[2, 2]);
        assert!(signed_maurer(&[0u8; 4], &grid).iter().all(|d| *d == f64::INFINITY));
        assert!(signed_maurer(&[3u8; 4], &grid).iter().all(|d| *d == f64::NEG_INFINITY));
    }

    #[test]
    fn approximate_distance_is_seeded_half_a_voxel_from_the_edge() {
        let grid = Grid::unit(&[1, 6]);
        let data = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let out = approximate_signed(&data, &grid);
        assert_eq!(out, vec![2.5, 1.5, 0.5, -0.5, -1.5, -2.5]);
    }
}
