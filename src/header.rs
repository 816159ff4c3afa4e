use std::str::FromStr;

use crate::{
    args::Value,
    array::AnyArray,
    enums::ElementType,
    error::{FilterError, Result},
};

pub const MIN_RANK: usize = 2;
pub const MAX_RANK: usize = 4;

/// What the dispatcher needs to know about an input image, read without
/// touching the element buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    pub rank: usize,
    pub element_type: ElementType,
    pub extents: Vec<usize>,
    pub spacing: Vec<f64>,
    pub origin: Vec<f64>,
    /// Whether spacing and origin came from an image record rather than
    /// unit defaults
    pub has_metadata: bool,
}

impl ImageHeader {
    /// Inspects a plain array or an image record.
    pub fn inspect(value: &Value) -> Result<Self> {
        match value {
            Value::Array(array) => Self::from_array(array),
            Value::Volume(volume) => {
                let mut header = Self::from_array(&volume.data)?;
                volume.validate()?;
                header.spacing = volume.spacing();
                header.origin = volume.origin();
                header.has_metadata = true;
                Ok(header)
            }
            Value::Empty => Err(FilterError::InvalidImage("no input image given".to_string())),
            other => Err(FilterError::InvalidImage(format!(
                "expected an array or an image record, got {}",
                other.kind()
            ))),
        }
    }

    pub fn from_array(array: &AnyArray) -> Result<Self> {
        Self::build(array.element_type(), array.shape())
    }

    /// Header for a raw element buffer described by a type tag and extents.
    pub fn from_raw(type_tag: &str, extents: &[usize], byte_len: usize) -> Result<Self> {
        let element_type = ElementType::from_str(type_tag).map_err(|_| {
            FilterError::InvalidImage(format!("unrecognised element type {type_tag}"))
        })?;
        let header = Self::build(element_type, extents)?;
        let expected = extents
            .iter()
            .try_fold(element_type.byte_size(), |bytes, &extent| bytes.checked_mul(extent))
            .ok_or_else(|| {
                FilterError::InvalidImage(format!("image of size {extents:?} does not fit in memory"))
            })?;
        if byte_len != expected {
            return Err(FilterError::InvalidImage(format!(
                "buffer of {byte_len} bytes does not hold {} {element_type} voxels",
                header.voxel_count()
            )));
        }
        Ok(header)
    }

    fn build(element_type: ElementType, extents: &[usize]) -> Result<Self> {
        let rank = extents.len();
        if !(MIN_RANK..=MAX_RANK).contains(&rank) {
            return Err(FilterError::InvalidImage(
                "Input image can only have 2 to 4 dimensions".to_string(),
            ));
        }
        if extents.contains(&0) {
            return Err(FilterError::InvalidImage(format!(
                "image of size {extents:?} has no voxels"
            )));
        }
        Ok(Self {
            rank,
            element_type,
            extents: extents.to_vec(),
            spacing: vec![1.0; rank],
            origin: vec![0.0; rank],
            has_metadata: false,
        })
    }

    pub fn voxel_count(&self) -> usize {
        self.extents.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{AxisInfo, Volume};
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn plain_arrays_get_unit_geometry() {
        let value = Value::from(ArrayD::<i16>::zeros(IxDyn(&[4, 5, 6])));
        let header = ImageHeader::inspect(&value).unwrap();
        assert_eq!(header.rank, 3);
        assert_eq!(header.element_type, ElementType::Int16);
        assert_eq!(header.extents, vec![4, 5, 6]);
        assert_eq!(header.spacing, vec![1.0; 3]);
        assert!(!header.has_metadata);
    }

    #[test]
    fn image_records_carry_spacing_and_origin() {
        let data: AnyArray = ArrayD::<f32>::zeros(IxDyn(&[3, 2])).into();
        let axes = vec![
            AxisInfo { size: 3, spacing: 0.5, origin: -1.0 },
            AxisInfo { size: 2, spacing: 2.0, origin: 4.0 },
        ];
        let value = Value::from(Volume::new(data, axes).unwrap());
        let header = ImageHeader::inspect(&value).unwrap();
        assert_eq!(header.spacing, vec![0.5, 2.0]);
        assert_eq!(header.origin, vec![-1.0, 4.0]);
        assert!(header.has_metadata);
    }

    #[test]
    fn rank_outside_two_to_four_is_rejected() {
        for shape in [&[5][..], &[2, 2, 2, 2, 2][..]] {
            let value = Value::from(ArrayD::<u8>::zeros(IxDyn(shape)));
            let err = ImageHeader::inspect(&value).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid input image: Input image can only have 2 to 4 dimensions"
            );
        }
    }

    #[test]
    fn non_images_are_rejected() {
        assert!(ImageHeader::inspect(&Value::from(3.0)).is_err());
        assert!(ImageHeader::inspect(&Value::Empty).is_err());
    }

    #[test]
    fn raw_headers_validate_tag_and_length() {
        let header = ImageHeader::from_raw("uint16", &[2, 3], 12).unwrap();
        assert_eq!(header.element_type, ElementType::Uint16);
        assert!(ImageHeader::from_raw("uint16", &[2, 3], 11).is_err());
        assert!(ImageHeader::from_raw("quaternion", &[2, 3], 12).is_err());
        assert!(ImageHeader::from_raw("double", &[usize::MAX, 2], 16).is_err());
    }
}
