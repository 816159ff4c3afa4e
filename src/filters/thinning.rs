//! Topology-preserving 3D thinning down to a curve skeleton.
//!
//! Border voxels are peeled in six directional sub-iterations. A voxel is
//! removed when it is simple (deleting it changes neither the number of
//! 26-connected object components nor the 6-connected background cavities
//! around it) and is not the end of a curve.

use tracing::debug;

use super::grid::{Grid, face_neighbours};

/// Index of `(dz, dy, dx)` in a row-major 3x3x3 cube
fn cube_index(d: [isize; 3]) -> usize {
    ((d[0] + 1) * 9 + (d[1] + 1) * 3 + (d[2] + 1)) as usize
}

fn cube_offset(index: usize) -> [isize; 3] {
    [(index / 9) as isize - 1, ((index / 3) % 3) as isize - 1, (index % 3) as isize - 1]
}

const CENTRE: usize = 13;

fn adjacent(a: usize, b: usize, face_only: bool) -> bool {
    let (pa, pb) = (cube_offset(a), cube_offset(b));
    let steps: Vec<isize> = (0..3).map(|k| (pa[k] - pb[k]).abs()).collect();
    if steps.iter().any(|&s| s > 1) || a == b {
        return false;
    }
    !face_only || steps.iter().sum::<isize>() == 1
}

/// Connected components of `members` under the chosen adjacency; returns
/// the component id of each member slot
fn components(members: &[bool; 27], face_only: bool) -> [Option<usize>; 27] {
    let mut label = [None; 27];
    let mut next = 0;
    for start in 0..27 {
        if !members[start] || label[start].is_some() {
            continue;
        }
        label[start] = Some(next);
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for other in 0..27 {
                if members[other] && label[other].is_none() && adjacent(current, other, face_only) {
                    label[other] = Some(next);
                    stack.push(other);
                }
            }
        }
        next += 1;
    }
    label
}

/// Simple-point test on the 3x3x3 neighbourhood (`true` = object)
pub fn is_simple(cube: &[bool; 27]) -> bool {
    let mut object = *cube;
    object[CENTRE] = false;
    let object_labels = components(&object, false);
    let object_count = object_labels.iter().flatten().max().map_or(0, |&m| m + 1);
    if object_count != 1 {
        return false;
    }

    // background restricted to the 18-neighbourhood
    let mut background = [false; 27];
    for (i, slot) in background.iter_mut().enumerate() {
        let d = cube_offset(i);
        let is_corner = d.iter().all(|&v| v != 0);
        *slot = i != CENTRE && !is_corner && !cube[i];
    }
    let background_labels = components(&background, true);
    let mut touching: Vec<usize> = [[-1, 0, 0], [1, 0, 0], [0, -1, 0], [0, 1, 0], [0, 0, -1], [0, 0, 1]]
        .iter()
        .filter_map(|&d| background_labels[cube_index(d)])
        .collect();
    touching.sort_unstable();
    touching.dedup();
    touching.len() == 1
}

fn neighbourhood(object: &[bool], grid: &Grid, coords: &[usize]) -> [bool; 27] {
    let mut cube = [false; 27];
    for (i, slot) in cube.iter_mut().enumerate() {
        let d = cube_offset(i);
        *slot = grid.shifted(coords, &d).is_some_and(|n| object[n]);
    }
    cube
}

fn is_end_point(cube: &[bool; 27]) -> bool {
    cube.iter().enumerate().filter(|&(i, &v)| v && i != CENTRE).count() == 1
}

/// Thins the non-zero voxels of a 3D image; the result is a 0/1 mask.
pub fn thin(object: &[bool], grid: &Grid) -> Vec<bool> {
    let mut current = object.to_vec();
    let directions = face_neighbours(3);
    let mut coords = [0usize; 3];
    let mut pass = 0;
    loop {
        let mut removed = 0usize;
        for direction in &directions {
            let candidates: Vec<usize> = (0..current.len())
                .filter(|&index| {
                    if !current[index] {
                        return false;
                    }
                    grid.fill_coords(index, &mut coords);
                    let border = grid.shifted(&coords, direction).is_none_or(|n| !current[n]);
                    border && {
                        let cube = neighbourhood(&current, grid, &coords);
                        !is_end_point(&cube) && is_simple(&cube)
                    }
                })
                .collect();
            for index in candidates {
                grid.fill_coords(index, &mut coords);
                let cube = neighbourhood(&current, grid, &coords);
                if !is_end_point(&cube) && is_simple(&cube) {
                    current[index] = false;
                    removed += 1;
                }
            }
        }
        debug!(pass, removed, "thinning pass");
        pass += 1;
        if removed == 0 {
            break;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_from(offsets: &[[isize; 3]]) -> [bool; 27] {
        let mut cube = [false; 27];
        cube[CENTRE] = true;
        for &d in offsets {
            cube[cube_index(d)] = true;
        }
        cube
    }

    #[test]
    fn simple_point_cases() {
        assert!(is_simple(&cube_from(&[[0, 0, 1]])));
        assert!(!is_simple(&cube_from(&[])));
        // bridge between two otherwise separate pieces
        assert!(!is_simple(&cube_from(&[[0, 0, 1], [0, 0, -1]])));
        let mut full = [true; 27];
        assert!(!is_simple(&full));
        full[cube_index([0, 0, 1])] = false;
        assert!(is_simple(&full));
    }

    #[test]
    fn a_solid_bar_thins_to_a_line() {
        let grid = Grid::unit(&[3, 3, 9]);
        let object = vec![true; grid.len()];
        let skeleton = thin(&object, &grid);
        let remaining: Vec<Vec<usize>> = (0..grid.len())
            .filter(|&i| skeleton[i])
            .map(|i| grid.coords(i))
            .collect();
        assert!(!remaining.is_empty());
        assert!(remaining.len() <= 9);
        for c in &remaining {
            assert_eq!((c[0], c[1]), (1, 1), "voxel {c:?} off the centre line");
        }
    }

    #[test]
    fn a_single_voxel_survives() {
        let grid = Grid::unit(&[3, 3, 3]);
        let mut object = vec![false; 27];
        object[13] = true;
        assert_eq!(thin(&object, &grid), object);
    }
}
