use crate::{
    array::AnyArray,
    enums::{ElementType, Orientation, SortBy},
    error::FilterError,
    volume::{AxisInfo, Volume},
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use image::DynamicImage;
use ndarray::{Array2, Array3, ArrayD, IxDyn, s};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("Unsupported raster layout: {0}")]
    UnsupportedRaster(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Sidecar header of a raw volume, stored as `<name>.json` next to the
/// `<name>.raw` element buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHeader {
    pub element_type: ElementType,
    pub shape: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<AxisInfo>>,
}

/// `<prefix>.<extension>`. Dots already in the file name are kept, so
/// `res.v1` becomes `res.v1.json` rather than `res.json`.
pub fn sibling(prefix: &Path, extension: &str) -> PathBuf {
    let mut name = prefix.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(extension);
    prefix.with_file_name(name)
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Loads whatever `path` points at: a directory of `.dcm` files, a raw
    /// volume (`.json` sidecar or `.raw` buffer) or a 2D raster image.
    pub fn load(path: impl AsRef<Path>, sort_by: SortBy) -> Result<Volume, VolumeLoaderError> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::load_from_directory(path, sort_by);
        }
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") | Some("raw") => Self::load_raw(path),
            Some("dcm") => Self::load_from_file_paths(&[path], sort_by),
            _ => Self::load_raster(path),
        }
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_slice(dicom_object, &sort_by))
            .collect();

        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, sort_by);

        let origin = slices[0].position;
        let images: Vec<_> = slices.into_iter().map(|slice| slice.image).collect();

        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let (row_spacing, column_spacing, slice_thickness) =
            Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;

        // patient position is (x, y, z); array axes are (slice, row, column)
        let origin = origin.unwrap_or([0.0; 3]);
        let (depth, height, width) = volume_array.dim();
        let axes = vec![
            AxisInfo {
                size: depth,
                spacing: slice_thickness,
                origin: origin[2],
            },
            AxisInfo {
                size: height,
                spacing: row_spacing,
                origin: origin[1],
            },
            AxisInfo {
                size: width,
                spacing: column_spacing,
                origin: origin[0],
            },
        ];
        info!(depth, height, width, "loaded DICOM series");

        Ok(Volume::new(AnyArray::Uint16(volume_array.into_dyn()), axes)?)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths: Vec<PathBuf> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    /// Reads a 2D raster image as a `[height, width]` array. 8-bit images
    /// become `uint8`, 16-bit images `uint16` and float images `single`;
    /// colour is reduced to luminance.
    pub fn load_raster(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        let image = image::open(path.as_ref())?;
        let data = Self::raster_to_array(image)?;
        debug!(shape = ?data.shape(), element_type = %data.element_type(), "loaded raster");
        Ok(Volume::from_array(data))
    }

    fn raster_to_array(image: DynamicImage) -> Result<AnyArray, VolumeLoaderError> {
        let shape = [image.height() as usize, image.width() as usize];
        let color = image.color();
        let bytes_per_channel = color.bytes_per_pixel() / color.channel_count().max(1);
        let data = match bytes_per_channel {
            1 => AnyArray::Uint8(ArrayD::from_shape_vec(
                IxDyn(&shape),
                image.into_luma8().into_raw(),
            )
            .map_err(FilterError::from)?),
            2 => AnyArray::Uint16(ArrayD::from_shape_vec(
                IxDyn(&shape),
                image.into_luma16().into_raw(),
            )
            .map_err(FilterError::from)?),
            4 => AnyArray::Single(ArrayD::from_shape_vec(
                IxDyn(&shape),
                image.to_luma32f().into_raw(),
            )
            .map_err(FilterError::from)?),
            _ => return Err(VolumeLoaderError::UnsupportedRaster(format!("{color:?}"))),
        };
        Ok(data)
    }

    /// Reads a raw volume from its `.json` sidecar and `.raw` buffer. Either
    /// file, or the common stem, may be given.
    pub fn load_raw(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        let path = path.as_ref();
        let stem = match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("raw") => {
                path.with_extension("")
            }
            _ => path.to_path_buf(),
        };
        let header: RawHeader = serde_json::from_slice(&fs::read(sibling(&stem, "json"))?)?;
        let bytes = fs::read(sibling(&stem, "raw"))?;
        let data = AnyArray::from_raw_bytes(header.element_type, &header.shape, &bytes)?;
        let volume = match header.axes {
            Some(axes) => Volume::new(data, axes)?,
            None => Volume::from_array(data),
        };
        debug!(shape = ?header.shape, element_type = %header.element_type, "loaded raw volume");
        Ok(volume)
    }

    /// Writes `volume` as `<prefix>.json` + `<prefix>.raw`.
    pub fn save_raw(prefix: impl AsRef<Path>, volume: &Volume) -> Result<(), VolumeLoaderError> {
        let prefix = prefix.as_ref();
        let header = RawHeader {
            element_type: volume.data.element_type(),
            shape: volume.dim().to_vec(),
            axes: Some(volume.axes.clone()),
        };
        fs::write(sibling(prefix, "json"), serde_json::to_vec_pretty(&header)?)?;
        fs::write(sibling(prefix, "raw"), volume.data.to_raw_bytes())?;
        Ok(())
    }

    /// Writes the normalised central slice of `volume` in `orientation` as a
    /// PNG. A 2D volume is written whole.
    pub fn save_preview(
        path: impl AsRef<Path>,
        volume: &Volume,
        orientation: Orientation,
    ) -> Result<(), VolumeLoaderError> {
        let image = volume.preview(orientation).ok_or_else(|| {
            FilterError::InvalidImage(format!(
                "no preview for a volume of shape {:?}",
                volume.dim()
            ))
        })?;
        image.save(path.as_ref())?;
        Ok(())
    }

    fn extract_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<DicomSlice> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image = Self::decode_image(dicom_object)?;
        Some(DicomSlice {
            order,
            position: Self::get_position(dicom_object),
            image,
        })
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn get_position(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<[f64; 3]> {
        let pos = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match pos.as_slice() {
            [x, y, z, ..] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_slices(slices: &mut [DicomSlice], sort_by: SortBy) {
        // ascending order keeps the first slice at the axis origin with positive spacing
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    fn validate_dimensions(images: &[Array2<u16>]) -> Result<(), VolumeLoaderError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<u16>]) -> Array3<u16> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f64, f64, f64)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float64()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float64()
                .ok()?;

            match pixel_spacing.as_slice() {
                [row, column, ..] => Some((*row, *column, slice_thickness)),
                _ => None,
            }
        })
    }
}

struct DicomSlice {
    order: Option<f32>,
    position: Option<[f64; 3]>,
    image: Array2<u16>,
}
