use crate::pixel::Pixel;

use super::grid::{Grid, ball_offsets};

/// Binary dilation with a ball of `radius`. Voxels not reached by the ball
/// keep their input value.
pub fn dilate<T: Pixel>(input: &[T], grid: &Grid, radius: usize, foreground: T) -> Vec<T> {
    let ball = ball_offsets(grid.shape(), radius);
    let mut output = input.to_vec();
    let mut coords = vec![0; grid.rank()];
    for (index, &value) in input.iter().enumerate() {
        if value != foreground {
            continue;
        }
        grid.fill_coords(index, &mut coords);
        for offset in &ball {
            if let Some(neighbour) = grid.shifted(&coords, offset) {
                output[neighbour] = foreground;
            }
        }
    }
    output
}

/// Binary erosion with a ball of `radius`. Foreground voxels whose ball
/// touches a non-foreground voxel become zero; the outside of the image
/// counts as foreground.
pub fn erode<T: Pixel>(input: &[T], grid: &Grid, radius: usize, foreground: T) -> Vec<T> {
    let ball = ball_offsets(grid.shape(), radius);
    let mut output = input.to_vec();
    let mut coords = vec![0; grid.rank()];
    for (index, &value) in input.iter().enumerate() {
        if value != foreground {
            continue;
        }
        grid.fill_coords(index, &mut coords);
        let touches_background = ball.iter().any(|offset| {
            grid.shifted(&coords, offset)
                .is_some_and(|neighbour| input[neighbour] != foreground)
        });
        if touches_background {
            output[index] = T::default();
        }
    }
    output
}
