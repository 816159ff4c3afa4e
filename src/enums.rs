use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumProperty, EnumString, IntoStaticStr};

/// Element type of an image buffer, named the way the host environment
/// names its array classes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[strum(to_string = "logical", serialize = "bool", serialize = "boolean")]
    #[serde(alias = "bool")]
    Logical,
    #[strum(to_string = "double", serialize = "f64")]
    #[serde(alias = "f64")]
    Double,
    #[strum(to_string = "single", serialize = "float", serialize = "f32")]
    #[serde(alias = "f32")]
    Single,
    #[strum(to_string = "int8", serialize = "i8")]
    Int8,
    #[strum(to_string = "uint8", serialize = "u8")]
    Uint8,
    #[strum(to_string = "int16", serialize = "i16")]
    Int16,
    #[strum(to_string = "uint16", serialize = "u16")]
    Uint16,
    #[strum(to_string = "int32", serialize = "i32")]
    Int32,
    #[strum(to_string = "uint32", serialize = "u32")]
    Uint32,
    #[strum(to_string = "int64", serialize = "i64")]
    Int64,
    #[strum(to_string = "uint64", serialize = "u64")]
    Uint64,
}

impl ElementType {
    /// Every type the dispatcher hands to a filter. `uint32` and `uint64` are
    /// recognised but never dispatched.
    pub const DISPATCHABLE: [ElementType; 9] = [
        ElementType::Logical,
        ElementType::Double,
        ElementType::Single,
        ElementType::Int8,
        ElementType::Uint8,
        ElementType::Int16,
        ElementType::Uint16,
        ElementType::Int32,
        ElementType::Int64,
    ];

    pub const FLOATING: [ElementType; 2] = [ElementType::Double, ElementType::Single];

    pub const SIGNED: [ElementType; 6] = [
        ElementType::Double,
        ElementType::Single,
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
    ];

    pub fn is_floating(self) -> bool {
        matches!(self, ElementType::Double | ElementType::Single)
    }

    pub fn byte_size(self) -> usize {
        match self {
            ElementType::Logical | ElementType::Int8 | ElementType::Uint8 => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Single | ElementType::Int32 | ElementType::Uint32 => 4,
            ElementType::Double | ElementType::Int64 | ElementType::Uint64 => 8,
        }
    }

    /// Largest value representable by the type, as f64
    pub fn max_value(self) -> f64 {
        match self {
            ElementType::Logical => 1.0,
            ElementType::Double => f64::MAX,
            ElementType::Single => f32::MAX as f64,
            ElementType::Int8 => i8::MAX as f64,
            ElementType::Uint8 => u8::MAX as f64,
            ElementType::Int16 => i16::MAX as f64,
            ElementType::Uint16 => u16::MAX as f64,
            ElementType::Int32 => i32::MAX as f64,
            ElementType::Uint32 => u32::MAX as f64,
            ElementType::Int64 => i64::MAX as f64,
            ElementType::Uint64 => u64::MAX as f64,
        }
    }

    /// Round-trips `value` through the element type, with the saturating
    /// semantics of an `as` cast.
    pub fn cast(self, value: f64) -> f64 {
        match self {
            ElementType::Logical => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ElementType::Double => value,
            ElementType::Single => value as f32 as f64,
            ElementType::Int8 => value as i8 as f64,
            ElementType::Uint8 => value as u8 as f64,
            ElementType::Int16 => value as i16 as f64,
            ElementType::Uint16 => value as u16 as f64,
            ElementType::Int32 => value as i32 as f64,
            ElementType::Uint32 => value as u32 as f64,
            ElementType::Int64 => value as i64 as f64,
            ElementType::Uint64 => value as u64 as f64,
        }
    }
}

/// The operations known to the catalog. The display form is the short name;
/// parsing accepts both the short and the canonical name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, EnumProperty, IntoStaticStr,
)]
pub enum FilterKind {
    #[strum(
        to_string = "skel",
        serialize = "BinaryThinningImageFilter3D",
        props(canonical = "BinaryThinningImageFilter3D")
    )]
    Skeletonize,
    #[strum(
        to_string = "dandist",
        serialize = "DanielssonDistanceMapImageFilter",
        props(canonical = "DanielssonDistanceMapImageFilter")
    )]
    DanielssonDistance,
    #[strum(
        to_string = "signdandist",
        serialize = "SignedDanielssonDistanceMapImageFilter",
        props(canonical = "SignedDanielssonDistanceMapImageFilter")
    )]
    SignedDanielssonDistance,
    #[strum(
        to_string = "maudist",
        serialize = "SignedMaurerDistanceMapImageFilter",
        props(canonical = "SignedMaurerDistanceMapImageFilter")
    )]
    SignedMaurerDistance,
    #[strum(
        to_string = "appsigndist",
        serialize = "ApproximateSignedDistanceMapImageFilter",
        props(canonical = "ApproximateSignedDistanceMapImageFilter")
    )]
    ApproximateSignedDistance,
    #[strum(
        to_string = "bwdilate",
        serialize = "BinaryDilateImageFilter",
        props(canonical = "BinaryDilateImageFilter")
    )]
    BinaryDilate,
    #[strum(
        to_string = "bwerode",
        serialize = "BinaryErodeImageFilter",
        props(canonical = "BinaryErodeImageFilter")
    )]
    BinaryErode,
    #[strum(
        to_string = "advess",
        serialize = "AnisotropicDiffusionVesselEnhancementImageFilter",
        props(canonical = "AnisotropicDiffusionVesselEnhancementImageFilter")
    )]
    VesselEnhancingDiffusion,
    #[strum(
        to_string = "hesves",
        serialize = "MultiScaleHessianSmoothed3DToVesselnessMeasureImageFilter",
        props(canonical = "MultiScaleHessianSmoothed3DToVesselnessMeasureImageFilter")
    )]
    HessianVesselness,
    #[strum(
        to_string = "median",
        serialize = "MedianImageFilter",
        props(canonical = "MedianImageFilter")
    )]
    Median,
    #[strum(
        to_string = "mrf",
        serialize = "MRFImageFilter",
        props(canonical = "MRFImageFilter")
    )]
    MarkovRandomField,
    #[strum(
        to_string = "voteholefill",
        serialize = "VotingBinaryIterativeHoleFillingImageFilter",
        props(canonical = "VotingBinaryIterativeHoleFillingImageFilter")
    )]
    VotingHoleFill,
    #[strum(
        to_string = "canny",
        serialize = "CannyEdgeDetectionImageFilter",
        props(canonical = "CannyEdgeDetectionImageFilter")
    )]
    CannyEdge,
}

impl FilterKind {
    pub fn short_name(self) -> &'static str {
        self.into()
    }

    pub fn canonical_name(self) -> &'static str {
        self.get_str("canonical").unwrap_or_else(|| self.short_name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

impl Orientation {
    /// Array axis that is held fixed when slicing in this orientation
    pub fn axis(self) -> usize {
        match self {
            Orientation::Axial => 0,
            Orientation::Coronal => 1,
            Orientation::Sagittal => 2,
        }
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
