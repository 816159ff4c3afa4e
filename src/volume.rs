use crate::array::AnyArray;
use crate::enums::Orientation;
use crate::error::{FilterError, Result};

use image::ImageBuffer;
use image::Luma;
use ndarray::{ArrayD, ArrayView2, Axis, Ix2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Spatial metadata of one image axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisInfo {
    pub size: usize,
    pub spacing: f64,
    pub origin: f64,
}

impl AxisInfo {
    pub fn unit(size: usize) -> Self {
        Self {
            size,
            spacing: 1.0,
            origin: 0.0,
        }
    }
}

/// An image together with per-axis spacing and origin, the richer input form
/// next to a plain array.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub data: AnyArray,
    pub axes: Vec<AxisInfo>,
}

impl Volume {
    /// Pairs `data` with its axes, checking that one axis is given per array
    /// dimension, that sizes agree and that spacings are positive.
    pub fn new(data: AnyArray, axes: Vec<AxisInfo>) -> Result<Self> {
        check_axes(&data, &axes)?;
        Ok(Self { data, axes })
    }

    /// Re-runs the checks of [`Volume::new`]. The fields are public, so a
    /// record built by hand may disagree with its data.
    pub fn validate(&self) -> Result<()> {
        check_axes(&self.data, &self.axes)
    }

    /// Unit spacing, zero origin
    pub fn from_array(data: AnyArray) -> Self {
        let axes = data.shape().iter().map(|&n| AxisInfo::unit(n)).collect();
        Self { data, axes }
    }

    /// Replaces the data, keeping the axes. Used to attach the input geometry
    /// to a filter output of the same size.
    pub fn with_data(&self, data: AnyArray) -> Result<Self> {
        Self::new(data, self.axes.clone())
    }

    pub fn dim(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn spacing(&self) -> Vec<f64> {
        self.axes.iter().map(|axis| axis.spacing).collect()
    }

    pub fn origin(&self) -> Vec<f64> {
        self.axes.iter().map(|axis| axis.origin).collect()
    }

    #[inline]
    fn normalize_to_u8(value: f64, min: f64, range: f64) -> u8 {
        if range <= 0.0 {
            return 0;
        }
        (((value - min) / range) * 255.0).clamp(0.0, 255.0) as u8
    }

    /// 2D slice through the volume. A 2D volume is returned whole; volumes
    /// with more than three axes are not sliced.
    pub fn get_slice_from_axis(&self, index: usize, orientation: Orientation) -> Option<ArrayD<f64>> {
        let values = self.data.to_f64_array();
        match self.data.ndim() {
            2 => Some(values),
            3 => {
                let axis = orientation.axis();
                if index >= values.shape()[axis] {
                    return None;
                }
                Some(values.index_axis(Axis(axis), index).to_owned())
            }
            _ => None,
        }
    }

    /// Central slice in `orientation`, min-max normalised to 8 bits
    pub fn preview(&self, orientation: Orientation) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let index = match self.data.ndim() {
            3 => self.dim()[orientation.axis()] / 2,
            _ => 0,
        };
        let slice = self.get_slice_from_axis(index, orientation)?;
        let slice = slice.into_dimensionality::<Ix2>().ok()?;
        Self::slice_to_image(&slice.view())
    }

    fn slice_to_image(slice: &ArrayView2<'_, f64>) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (height, width) = slice.dim();
        let finite = slice.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let range = max - min;
        let values: Vec<f64> = slice.iter().copied().collect();
        let pixel_data: Vec<u8> = values
            .into_par_iter()
            .map(|v| Self::normalize_to_u8(v, min, range))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }
}

fn check_axes(data: &AnyArray, axes: &[AxisInfo]) -> Result<()> {
    if axes.len() != data.ndim() {
        return Err(FilterError::InvalidImage(format!(
            "{} axis records given for an array with {} dimensions",
            axes.len(),
            data.ndim()
        )));
    }
    for (i, (axis, &extent)) in axes.iter().zip(data.shape()).enumerate() {
        if axis.size != extent {
            return Err(FilterError::InvalidImage(format!(
                "axis {i} declares size {} but the data has {extent} voxels",
                axis.size
            )));
        }
        if !(axis.spacing.is_finite() && axis.spacing > 0.0) {
            return Err(FilterError::InvalidImage(format!(
                "axis {i} has non-positive spacing {}",
                axis.spacing
            )));
        }
        if !axis.origin.is_finite() {
            return Err(FilterError::InvalidImage(format!(
                "axis {i} has a non-finite origin"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn ramp(shape: &[usize]) -> AnyArray {
        let n: usize = shape.iter().product();
        AnyArray::Double(ArrayD::from_shape_vec(IxDyn(shape), (0..n).map(|v| v as f64).collect()).unwrap())
    }

    #[test]
    fn new_rejects_mismatched_axes() {
        let err = Volume::new(ramp(&[2, 3]), vec![AxisInfo::unit(2)]).unwrap_err();
        assert!(matches!(err, FilterError::InvalidImage(_)));

        let err = Volume::new(ramp(&[2, 3]), vec![AxisInfo::unit(2), AxisInfo::unit(4)]).unwrap_err();
        assert!(err.to_string().contains("axis 1"));

        let mut axes = vec![AxisInfo::unit(2), AxisInfo::unit(3)];
        axes[0].spacing = 0.0;
        assert!(Volume::new(ramp(&[2, 3]), axes).is_err());
    }

    #[test]
    fn from_array_uses_unit_geometry() {
        let volume = Volume::from_array(ramp(&[4, 5, 6]));
        assert_eq!(volume.spacing(), vec![1.0; 3]);
        assert_eq!(volume.origin(), vec![0.0; 3]);
        assert_eq!(volume.dim(), &[4, 5, 6]);
    }

    #[test]
    fn slices_follow_orientation_axes() {
        let volume = Volume::from_array(ramp(&[2, 3, 4]));
        assert_eq!(volume.get_slice_from_axis(1, Orientation::Axial).unwrap().shape(), &[3, 4]);
        assert_eq!(volume.get_slice_from_axis(0, Orientation::Coronal).unwrap().shape(), &[2, 4]);
        assert_eq!(volume.get_slice_from_axis(3, Orientation::Sagittal).unwrap().shape(), &[2, 3]);
        assert!(volume.get_slice_from_axis(2, Orientation::Axial).is_none());
    }

    #[test]
    fn preview_spans_the_full_gray_range() {
        let volume = Volume::from_array(ramp(&[3, 4]));
        let image = volume.preview(Orientation::Axial).unwrap();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image.get_pixel(3, 2)[0], 255);
    }
}
