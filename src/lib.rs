//! # imfilter
//!
//! Runtime-dispatched image filters for 2D, 3D and 4D arrays.
//!
//! A caller names a filter with a short string (`"bwdilate"`, `"median"`,
//! `"hesves"`, ...), hands over an image whose element type and rank are only
//! known at run time, and passes optional parameters by position or by name.
//! The dispatcher checks the name against a static catalog, validates that the
//! filter is enabled for the image's rank and element type, binds parameters
//! (substituting defaults derived from the image), runs a kernel monomorphised
//! for the element type, and returns the declared outputs by name.
//!
//! Images come in two forms:
//!  - a plain [`AnyArray`] (or any `ndarray::ArrayD<T>` of a supported type)
//!  - a [`Volume`], which also carries per-axis spacing and origin
//!
//! Available filters:
//!  - Morphology: `bwdilate`, `bwerode`
//!  - Distance maps: `dandist`, `signdandist`, `maudist`, `appsigndist`
//!  - Skeletonization: `skel` (3D thinning)
//!  - Vessel filters: `hesves` (multiscale Hessian vesselness), `advess`
//!    (vessel-enhancing anisotropic diffusion)
//!  - Denoising and segmentation: `median`, `voteholefill`, `mrf`
//!  - Edges: `canny`
//!
//! Every call is synchronous; kernels parallelise internally with rayon.
//! [`catalog::schemas`] describes every operation with its parameters,
//! defaults, enabled types and ranks.
//!
//! Volumes can also be read from a directory of DICOM files, from a 2D raster
//! image or from a raw buffer with a JSON sidecar, see [`VolumeLoader`].
//!
//! # Examples
//!
//! ## Smoothing a DICOM series
//!
//! Load all DICOM files from the dicom/ directory sorted by InstanceNumber,
//! apply a 3D median filter with a radius of one voxel along each axis and
//! save the result next to its geometry.
//!
//! ```no_run
//! # use imfilter::{FilterCall, SortBy, VolumeLoader};
//! let volume = VolumeLoader::load_from_directory("dicom", SortBy::InstanceNumber)
//!     .expect("should have loaded files from directory");
//! let outputs = FilterCall::new("median", volume.clone())
//!     .arg(vec![1.0, 1.0, 1.0])
//!     .run()
//!     .expect("median should accept a uint16 volume");
//! let smoothed = volume
//!     .with_data(outputs[0].data.clone())
//!     .expect("median keeps the input shape");
//! VolumeLoader::save_raw("smoothed", &smoothed).expect("should have written the result");
//! ```

pub mod args;
pub mod array;
pub mod catalog;
pub mod dispatch;
pub mod enums;
pub mod error;
pub mod executor;
pub mod filters;
pub mod header;
pub mod pixel;
pub mod volume;
pub mod volume_loader;

pub use args::Value;
pub use array::AnyArray;
pub use dispatch::{FilterCall, invoke};
pub use enums::{ElementType, FilterKind, Orientation, SortBy};
pub use error::{FilterError, Result};
pub use executor::Output;
pub use header::ImageHeader;
pub use volume::{AxisInfo, Volume};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
