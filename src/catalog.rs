//! Filter catalog.
//!
//! One immutable [`OperationDescriptor`] per [`FilterKind`], built on first
//! use and shared for the life of the process. A descriptor lists the ranks
//! and element types the operation is enabled for, its parameter schema in
//! positional order, its outputs, and the runner the executor calls.

use std::{collections::HashMap, str::FromStr, sync::OnceLock};

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    enums::{ElementType, FilterKind},
    error::{FilterError, Result},
    executor::{self, Runner},
};

/// How a parameter value is read and coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Scalar,
    /// Non-negative integer, non-integers floored
    Count,
    Flag,
    /// Scalar cast to the input element type
    PixelValue,
    /// One value per image axis
    AxisVector,
    /// One non-negative integer per image axis
    AxisCounts,
    /// Free-length vector cast to the input element type
    PixelVector,
    /// Odd-sized weight array with the image's rank
    Neighborhood,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDefault {
    Required,
    Scalar(f64),
    Flag(bool),
    /// The same value on every axis
    PerAxis(f64),
    /// Largest value of the input element type
    PixelMax,
    /// Half of another, earlier parameter
    HalfOf(&'static str),
    /// Unit weights over the 3^rank box with a zero centre
    CentreZeroCube,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamDefault,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        self.default == ParamDefault::Required
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputElement {
    SameAsInput,
    Fixed(ElementType),
    /// `int64` offsets with a leading axis of length rank
    OffsetVectors,
}

impl OutputElement {
    pub fn resolve(self, input: ElementType) -> ElementType {
        match self {
            OutputElement::SameAsInput => input,
            OutputElement::Fixed(element_type) => element_type,
            OutputElement::OffsetVectors => ElementType::Int64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputSpec {
    pub name: &'static str,
    pub element: OutputElement,
    pub description: &'static str,
}

pub struct OperationDescriptor {
    pub kind: FilterKind,
    pub ranks: &'static [usize],
    pub element_types: &'static [ElementType],
    /// Message for a rank outside `ranks`
    pub rank_error: Option<&'static str>,
    /// Message for a dispatchable element type outside `element_types`
    pub type_error: Option<&'static str>,
    pub params: &'static [ParamSpec],
    pub outputs: &'static [OutputSpec],
    pub run: Runner,
}

impl OperationDescriptor {
    pub fn short_name(&self) -> &'static str {
        self.kind.short_name()
    }

    pub fn canonical_name(&self) -> &'static str {
        self.kind.canonical_name()
    }

    pub fn min_arguments(&self) -> usize {
        2 + self.params.iter().filter(|p| p.is_required()).count()
    }

    pub fn max_arguments(&self) -> usize {
        2 + self.params.len()
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn supports(&self, rank: usize, element_type: ElementType) -> bool {
        self.ranks.contains(&rank) && self.element_types.contains(&element_type)
    }

    /// Rejects a (rank, type) pair the operation is not enabled for. Rank is
    /// checked first.
    pub fn check(&self, rank: usize, element_type: ElementType) -> Result<()> {
        if !self.ranks.contains(&rank) {
            let reason = self.rank_error.map(str::to_string).unwrap_or_else(|| {
                format!("{} does not accept {rank}D input images", self.canonical_name())
            });
            return Err(self.unsupported(reason));
        }
        if !self.element_types.contains(&element_type) {
            let reason = match self.type_error {
                Some(message) if ElementType::DISPATCHABLE.contains(&element_type) => message.to_string(),
                _ => format!(
                    "{} does not accept input images of type {element_type}",
                    self.canonical_name()
                ),
            };
            return Err(self.unsupported(reason));
        }
        Ok(())
    }

    fn unsupported(&self, reason: String) -> FilterError {
        FilterError::Unsupported {
            filter: self.canonical_name(),
            reason,
        }
    }

    pub fn schema(&self) -> OperationSchema {
        OperationSchema {
            name: self.short_name(),
            canonical_name: self.canonical_name(),
            ranks: self.ranks.to_vec(),
            element_types: self.element_types.to_vec(),
            params: self.params.to_vec(),
            outputs: self.outputs.to_vec(),
        }
    }
}

/// Serializable view of a descriptor
#[derive(Debug, Clone, Serialize)]
pub struct OperationSchema {
    pub name: &'static str,
    pub canonical_name: &'static str,
    pub ranks: Vec<usize>,
    pub element_types: Vec<ElementType>,
    pub params: Vec<ParamSpec>,
    pub outputs: Vec<OutputSpec>,
}

const ALL_RANKS: &[usize] = &[2, 3, 4];
const VOLUME_ONLY: &[usize] = &[3];

const ALL_TYPES: &[ElementType] = &ElementType::DISPATCHABLE;
const FLOATING: &[ElementType] = &ElementType::FLOATING;
const SIGNED: &[ElementType] = &ElementType::SIGNED;
const NON_LOGICAL: &[ElementType] = &[
    ElementType::Double,
    ElementType::Single,
    ElementType::Int8,
    ElementType::Uint8,
    ElementType::Int16,
    ElementType::Uint16,
    ElementType::Int32,
    ElementType::Int64,
];

const fn param(
    name: &'static str,
    kind: ParamKind,
    default: ParamDefault,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        default,
        description,
    }
}

const fn output(name: &'static str, element: OutputElement, description: &'static str) -> OutputSpec {
    OutputSpec {
        name,
        element,
        description,
    }
}

const SAME_B: &[OutputSpec] = &[output("B", OutputElement::SameAsInput, "filtered image")];

const DANIELSSON_OUTPUTS: &[OutputSpec] = &[
    output("B", OutputElement::Fixed(ElementType::Double), "distance map"),
    output("V", OutputElement::SameAsInput, "Voronoi map"),
    output("W", OutputElement::OffsetVectors, "offset to the closest voxel"),
];

const SIGNED_DANIELSSON_OUTPUTS: &[OutputSpec] = &[
    output("B", OutputElement::Fixed(ElementType::Single), "signed distance map"),
    output("V", OutputElement::SameAsInput, "Voronoi map"),
    output("W", OutputElement::OffsetVectors, "offset to the closest voxel"),
];

const SIGNED_DISTANCE_OUTPUT: &[OutputSpec] = &[output(
    "B",
    OutputElement::Fixed(ElementType::Single),
    "signed distance map",
)];

const VESSELNESS_OUTPUT: &[OutputSpec] = &[output(
    "B",
    OutputElement::Fixed(ElementType::Double),
    "vesselness measure",
)];

const LABEL_OUTPUT: &[OutputSpec] = &[output("B", OutputElement::Fixed(ElementType::Uint8), "class labels")];

const CANNY_OUTPUTS: &[OutputSpec] = &[
    output("B", OutputElement::SameAsInput, "edge mask"),
    output("C", OutputElement::SameAsInput, "non-maximum suppressed gradient"),
];

const MORPHOLOGY_PARAMS: &[ParamSpec] = &[
    param("RADIUS", ParamKind::Count, ParamDefault::Scalar(0.0), "ball radius in voxels"),
    param("FOREGROUND", ParamKind::PixelValue, ParamDefault::Scalar(1.0), "object value"),
];

const VESSEL_SCALE_PARAMS: [ParamSpec; 4] = [
    param("SIGMAMIN", ParamKind::Scalar, ParamDefault::Scalar(0.2), "smallest scale"),
    param("SIGMAMAX", ParamKind::Scalar, ParamDefault::Scalar(2.0), "largest scale"),
    param("NUMSIGMASTEPS", ParamKind::Count, ParamDefault::Scalar(10.0), "number of scales"),
    param(
        "ISSIGMASTEPLOG",
        ParamKind::Flag,
        ParamDefault::Flag(true),
        "logarithmic rather than linear scale steps",
    ),
];

const HESSIAN_PARAMS: &[ParamSpec] = &VESSEL_SCALE_PARAMS;

const DIFFUSION_PARAMS: &[ParamSpec] = &[
    VESSEL_SCALE_PARAMS[0],
    VESSEL_SCALE_PARAMS[1],
    VESSEL_SCALE_PARAMS[2],
    VESSEL_SCALE_PARAMS[3],
    param("NUMITERATIONS", ParamKind::Count, ParamDefault::Scalar(1.0), "diffusion steps"),
    param(
        "WSTRENGTH",
        ParamKind::Scalar,
        ParamDefault::Scalar(25.0),
        "diffusion strength along vessels",
    ),
    param(
        "SENSITIVITY",
        ParamKind::Scalar,
        ParamDefault::Scalar(5.0),
        "vesselness sensitivity",
    ),
    param("TIMESTEP", ParamKind::Scalar, ParamDefault::Scalar(1e-3), "explicit time step"),
    param(
        "EPSILON",
        ParamKind::Scalar,
        ParamDefault::Scalar(1e-2),
        "diffusion strength across vessels",
    ),
];

const MEDIAN_PARAMS: &[ParamSpec] = &[param(
    "RADIUS",
    ParamKind::AxisCounts,
    ParamDefault::PerAxis(0.0),
    "box radius per axis",
)];

const MRF_PARAMS: &[ParamSpec] = &[
    param("MU", ParamKind::PixelVector, ParamDefault::Required, "class centroids"),
    param(
        "WEIGHTS",
        ParamKind::Neighborhood,
        ParamDefault::CentreZeroCube,
        "neighbourhood weights",
    ),
    param("SMOOTH", ParamKind::Scalar, ParamDefault::Scalar(1e-7), "smoothing factor"),
    param("NITER", ParamKind::Count, ParamDefault::Scalar(100.0), "maximum number of sweeps"),
    param(
        "TOL",
        ParamKind::Scalar,
        ParamDefault::Scalar(1e-7),
        "stop when fewer voxels than this fraction change",
    ),
];

const HOLE_FILL_PARAMS: &[ParamSpec] = &[
    param("RADIUS", ParamKind::AxisCounts, ParamDefault::PerAxis(1.0), "box radius per axis"),
    param("MAXITER", ParamKind::Count, ParamDefault::Scalar(1.0), "maximum iterations"),
    param(
        "THR",
        ParamKind::Count,
        ParamDefault::Scalar(2.0),
        "votes above half the box needed to fill",
    ),
    param("BACKGROUND", ParamKind::PixelValue, ParamDefault::Scalar(0.0), "hole value"),
    param("FOREGROUND", ParamKind::PixelValue, ParamDefault::Scalar(1.0), "object value"),
];

const CANNY_PARAMS: &[ParamSpec] = &[
    param(
        "VAR",
        ParamKind::AxisVector,
        ParamDefault::PerAxis(0.0),
        "Gaussian variance per axis, physical units",
    ),
    param("UPPTHR", ParamKind::PixelValue, ParamDefault::PixelMax, "upper hysteresis threshold"),
    param(
        "LOWTHR",
        ParamKind::PixelValue,
        ParamDefault::HalfOf("UPPTHR"),
        "lower hysteresis threshold",
    ),
    param(
        "MAXERR",
        ParamKind::AxisVector,
        ParamDefault::PerAxis(0.01),
        "Gaussian truncation error per axis",
    ),
];

fn descriptors() -> Vec<OperationDescriptor> {
    use FilterKind::*;

    FilterKind::iter()
        .map(|kind| match kind {
            Skeletonize => OperationDescriptor {
                kind,
                ranks: VOLUME_ONLY,
                element_types: ALL_TYPES,
                rank_error: Some("BinaryThinningImageFilter3D only accepts 3D input images"),
                type_error: None,
                params: &[],
                outputs: SAME_B,
                run: executor::run_skeletonize,
            },
            DanielssonDistance => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: &[],
                outputs: DANIELSSON_OUTPUTS,
                run: executor::run_danielsson,
            },
            SignedDanielssonDistance => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: &[],
                outputs: SIGNED_DANIELSSON_OUTPUTS,
                run: executor::run_signed_danielsson,
            },
            SignedMaurerDistance => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: NON_LOGICAL,
                rank_error: None,
                type_error: Some(
                    "SignedMaurerDistanceMapImageFilter does not accept input image with type boolean",
                ),
                params: &[],
                outputs: SIGNED_DISTANCE_OUTPUT,
                run: executor::run_signed_maurer,
            },
            ApproximateSignedDistance => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: &[],
                outputs: SIGNED_DISTANCE_OUTPUT,
                run: executor::run_approximate_signed_distance,
            },
            BinaryDilate => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: MORPHOLOGY_PARAMS,
                outputs: SAME_B,
                run: executor::run_dilate,
            },
            BinaryErode => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: MORPHOLOGY_PARAMS,
                outputs: SAME_B,
                run: executor::run_erode,
            },
            VesselEnhancingDiffusion => OperationDescriptor {
                kind,
                ranks: VOLUME_ONLY,
                element_types: SIGNED,
                rank_error: Some(
                    "AnisotropicDiffusionVesselEnhancementImageFilter only accepts 3D input images",
                ),
                type_error: Some(
                    "AnisotropicDiffusionVesselEnhancementImageFilter only accepts input images with signed type",
                ),
                params: DIFFUSION_PARAMS,
                outputs: SAME_B,
                run: executor::run_vessel_diffusion,
            },
            HessianVesselness => OperationDescriptor {
                kind,
                ranks: VOLUME_ONLY,
                element_types: ALL_TYPES,
                rank_error: Some(
                    "MultiScaleHessianSmoothed3DToVesselnessMeasureImageFilter only accepts 3D input images",
                ),
                type_error: None,
                params: HESSIAN_PARAMS,
                outputs: VESSELNESS_OUTPUT,
                run: executor::run_hessian_vesselness,
            },
            Median => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: MEDIAN_PARAMS,
                outputs: SAME_B,
                run: executor::run_median,
            },
            MarkovRandomField => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: MRF_PARAMS,
                outputs: LABEL_OUTPUT,
                run: executor::run_mrf,
            },
            VotingHoleFill => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: ALL_TYPES,
                rank_error: None,
                type_error: None,
                params: HOLE_FILL_PARAMS,
                outputs: SAME_B,
                run: executor::run_voting_hole_fill,
            },
            CannyEdge => OperationDescriptor {
                kind,
                ranks: ALL_RANKS,
                element_types: FLOATING,
                rank_error: None,
                type_error: Some(
                    "CannyEdgeDetectionImageFilter only accepts input images with floating type (double or single)",
                ),
                params: CANNY_PARAMS,
                outputs: CANNY_OUTPUTS,
                run: executor::run_canny,
            },
        })
        .collect()
}

fn catalog() -> &'static HashMap<FilterKind, OperationDescriptor> {
    static CATALOG: OnceLock<HashMap<FilterKind, OperationDescriptor>> = OnceLock::new();
    CATALOG.get_or_init(|| descriptors().into_iter().map(|d| (d.kind, d)).collect())
}

pub fn descriptor(kind: FilterKind) -> &'static OperationDescriptor {
    // every kind has an entry, see `descriptors`
    &catalog()[&kind]
}

/// Resolves a short or canonical name.
pub fn lookup(name: &str) -> Result<&'static OperationDescriptor> {
    FilterKind::from_str(name)
        .map(descriptor)
        .map_err(|_| FilterError::InvalidFilter(name.to_string()))
}

/// Schemas of every operation, in catalog order
pub fn schemas() -> Vec<OperationSchema> {
    FilterKind::iter().map(|kind| descriptor(kind).schema()).collect()
}
