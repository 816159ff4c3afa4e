/// Integer step from a voxel to one of its neighbours, one entry per axis
pub type Offset = Vec<isize>;

/// Row-major layout of a flattened N-d image with its physical spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    shape: Vec<usize>,
    strides: Vec<usize>,
    spacing: Vec<f64>,
}

impl Grid {
    pub fn new(shape: &[usize], spacing: &[f64]) -> Self {
        let mut strides = vec![1; shape.len()];
        for axis in (0..shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * shape[axis + 1];
        }
        let spacing = if spacing.len() == shape.len() {
            spacing.to_vec()
        } else {
            vec![1.0; shape.len()]
        };
        Self {
            shape: shape.to_vec(),
            strides,
            spacing,
        }
    }

    pub fn unit(shape: &[usize]) -> Self {
        Self::new(shape, &[])
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stride(&self, axis: usize) -> usize {
        self.strides[axis]
    }

    pub fn coords(&self, index: usize) -> Vec<usize> {
        let mut coords = vec![0; self.rank()];
        self.fill_coords(index, &mut coords);
        coords
    }

    /// Writes the coordinates of `index` into `out`, which holds one slot per
    /// axis.
    pub fn fill_coords(&self, index: usize, out: &mut [usize]) {
        for ((slot, &stride), &extent) in out.iter_mut().zip(&self.strides).zip(&self.shape) {
            *slot = (index / stride) % extent;
        }
    }

    pub fn axis_coord(&self, index: usize, axis: usize) -> usize {
        (index / self.strides[axis]) % self.shape[axis]
    }

    pub fn index(&self, coords: &[usize]) -> usize {
        coords.iter().zip(&self.strides).map(|(c, s)| c * s).sum()
    }

    /// Index of `coords + delta`, `None` when it leaves the image
    pub fn shifted(&self, coords: &[usize], delta: &[isize]) -> Option<usize> {
        let mut index = 0;
        for axis in 0..self.rank() {
            let c = coords[axis] as isize + delta[axis];
            if c < 0 || c >= self.shape[axis] as isize {
                return None;
            }
            index += c as usize * self.strides[axis];
        }
        Some(index)
    }

    /// Index of `coords + delta` with every axis clamped to the image
    pub fn shifted_clamped(&self, coords: &[usize], delta: &[isize]) -> usize {
        let mut index = 0;
        for axis in 0..self.rank() {
            let max = self.shape[axis] as isize - 1;
            let c = (coords[axis] as isize + delta[axis]).clamp(0, max);
            index += c as usize * self.strides[axis];
        }
        index
    }

    /// Physical length of an offset
    pub fn length(&self, delta: &[isize]) -> f64 {
        delta
            .iter()
            .zip(&self.spacing)
            .map(|(&d, &s)| (d as f64 * s).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Squared physical distance between two voxels
    pub fn distance_squared(&self, a: &[usize], b: &[usize]) -> f64 {
        a.iter()
            .zip(b)
            .zip(&self.spacing)
            .map(|((&x, &y), &s)| ((x as f64 - y as f64) * s).powi(2))
            .sum()
    }
}

/// Every offset in the box `[-r_i, r_i]`, row-major, centre included
pub fn box_offsets(radius: &[usize]) -> Vec<Offset> {
    let mut offsets = vec![Vec::with_capacity(radius.len())];
    for &r in radius {
        let r = r as isize;
        offsets = offsets
            .into_iter()
            .flat_map(|prefix| {
                (-r..=r).map(move |d| {
                    let mut next = prefix.clone();
                    next.push(d);
                    next
                })
            })
            .collect();
    }
    offsets
}

/// Discretised ball: offsets with `Σ d_i² <= (r + 0.5)²`. Steps that leave
/// an image of `shape` from every voxel are not generated, so the offset
/// count is bounded by the image size whatever the radius.
pub fn ball_offsets(shape: &[usize], radius: usize) -> Vec<Offset> {
    let limit = (radius as f64 + 0.5).powi(2);
    let reach: Vec<usize> = shape.iter().map(|&n| radius.min(n.saturating_sub(1))).collect();
    box_offsets(&reach)
        .into_iter()
        .filter(|offset| offset.iter().map(|&d| (d * d) as f64).sum::<f64>() <= limit)
        .collect()
}

/// The `3^rank - 1` neighbours of a voxel
pub fn full_neighbourhood(rank: usize) -> Vec<Offset> {
    box_offsets(&vec![1; rank])
        .into_iter()
        .filter(|offset| offset.iter().any(|&d| d != 0))
        .collect()
}

/// The `2 * rank` face neighbours of a voxel
pub fn face_neighbours(rank: usize) -> Vec<Offset> {
    let mut offsets = Vec::with_capacity(2 * rank);
    for axis in 0..rank {
        for step in [-1, 1] {
            let mut offset = vec![0; rank];
            offset[axis] = step;
            offsets.push(offset);
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_and_index_are_row_major() {
        let grid = Grid::unit(&[2, 3, 4]);
        assert_eq!(grid.stride(0), 12);
        assert_eq!(grid.coords(23), vec![1, 2, 3]);
        assert_eq!(grid.index(&[1, 0, 2]), 14);
    }

    #[test]
    fn shifts_respect_bounds() {
        let grid = Grid::unit(&[3, 3]);
        assert_eq!(grid.shifted(&[0, 0], &[1, 1]), Some(4));
        assert_eq!(grid.shifted(&[0, 0], &[-1, 0]), None);
        assert_eq!(grid.shifted_clamped(&[0, 2], &[-1, 1]), 2);
    }

    #[test]
    fn neighbourhood_sizes() {
        assert_eq!(box_offsets(&[1, 2]).len(), 15);
        assert_eq!(full_neighbourhood(3).len(), 26);
        assert_eq!(face_neighbours(4).len(), 8);
        assert_eq!(ball_offsets(&[9, 9], 1).len(), 9);
        assert_eq!(ball_offsets(&[9, 9], 2).len(), 21);
    }

    #[test]
    fn huge_balls_stop_at_the_image_extent() {
        assert_eq!(ball_offsets(&[3, 3], usize::MAX / 4).len(), 25);
        assert_eq!(ball_offsets(&[1, 4, 2], 1_000_000).len(), 21);
        // the radius still decides which diagonal steps are kept
        assert_eq!(ball_offsets(&[3, 3], 1), ball_offsets(&[100, 100], 1));
    }

    #[test]
    fn filled_coords_match_allocated_ones() {
        let grid = Grid::unit(&[3, 4, 5]);
        let mut buffer = [0; 3];
        for index in 0..grid.len() {
            grid.fill_coords(index, &mut buffer);
            assert_eq!(buffer.to_vec(), grid.coords(index));
            assert_eq!(grid.axis_coord(index, 1), buffer[1]);
        }
    }

    #[test]
    fn physical_lengths_use_spacing() {
        let grid = Grid::new(&[4, 4], &[3.0, 4.0]);
        assert_eq!(grid.length(&[1, 1]), 5.0);
        assert_eq!(grid.distance_squared(&[0, 0], &[1, 1]), 25.0);
    }
}
