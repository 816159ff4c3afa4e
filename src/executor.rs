//! Operation executor.
//!
//! For a resolved descriptor the executor binds every declared parameter,
//! runs the filter once and collects each declared output exactly once.

use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::{
    args::{ArgHandle, ArgumentRegistry},
    array::{AnyArray, with_any_array},
    catalog::{OperationDescriptor, OutputElement, OutputSpec, ParamDefault, ParamKind, ParamSpec},
    enums::ElementType,
    error::{FilterError, Result},
    filters::{
        canny::{self, CannyParams},
        diffusion::{self, DiffusionParams},
        distance,
        grid::Grid,
        hessian::{self, ScaleRange},
        hole_fill::{self, VotingParams},
        median, morphology,
        mrf::{self, MrfParams},
        thinning,
    },
    header::ImageHeader,
    pixel::Pixel,
};

pub type Runner = fn(&Invocation<'_>, &mut OutputSink) -> Result<()>;

const MAX_CLASSES: usize = 256;

/// A parameter value after coercion and default substitution
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Scalar(f64),
    Count(usize),
    Flag(bool),
    Vector(Vec<f64>),
    Counts(Vec<usize>),
    Neighborhood { weights: Vec<f64>, half_size: Vec<usize> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBinding {
    values: BTreeMap<&'static str, Bound>,
}

impl ParameterBinding {
    /// Registers every parameter of `descriptor` at its position after the
    /// filter name and image, then reads each with its default. Named
    /// arguments the operation does not declare are malformed.
    pub fn bind(
        descriptor: &OperationDescriptor,
        args: &mut ArgumentRegistry,
        header: &ImageHeader,
    ) -> Result<Self> {
        let handles: Vec<ArgHandle> = descriptor
            .params
            .iter()
            .enumerate()
            .map(|(position, spec)| args.register(2 + position, spec.name))
            .collect();
        if let Some(name) = args.unclaimed_names().first() {
            return Err(FilterError::malformed(
                name,
                format!("{} has no such parameter", descriptor.canonical_name()),
            ));
        }

        let mut binding = Self::default();
        for (spec, handle) in descriptor.params.iter().zip(handles) {
            let bound = binding.read(spec, handle, args, header)?;
            debug!(parameter = spec.name, value = ?bound, "bound parameter");
            binding.values.insert(spec.name, bound);
        }
        Ok(binding)
    }

    fn default_scalar(&self, spec: &ParamSpec, header: &ImageHeader) -> Result<f64> {
        Ok(match spec.default {
            ParamDefault::Scalar(value) | ParamDefault::PerAxis(value) => value,
            ParamDefault::Flag(flag) => f64::from(u8::from(flag)),
            ParamDefault::PixelMax => header.element_type.max_value(),
            ParamDefault::HalfOf(other) => self.scalar(other)? / 2.0,
            ParamDefault::Required | ParamDefault::CentreZeroCube => 0.0,
        })
    }

    fn read(
        &self,
        spec: &ParamSpec,
        handle: ArgHandle,
        args: &ArgumentRegistry,
        header: &ImageHeader,
    ) -> Result<Bound> {
        let rank = header.rank;
        let element_type = header.element_type;
        let default = self.default_scalar(spec, header)?;
        let bound = match spec.kind {
            ParamKind::Scalar => Bound::Scalar(args.read_scalar(handle, default)?),
            ParamKind::Count => Bound::Count(args.read_count(handle, default as usize)?),
            ParamKind::Flag => Bound::Flag(args.read_flag(handle, default != 0.0)?),
            ParamKind::PixelValue => Bound::Scalar(element_type.cast(args.read_scalar(handle, default)?)),
            ParamKind::AxisVector => {
                Bound::Vector(args.read_row_vector(handle, vec![default; rank], Some(rank))?)
            }
            ParamKind::AxisCounts => {
                Bound::Counts(args.read_counts(handle, vec![default as usize; rank])?)
            }
            ParamKind::PixelVector => {
                let values = args.read_row_vector(handle, Vec::new(), None)?;
                if values.is_empty() && spec.is_required() {
                    return Err(FilterError::malformed(spec.name, "a non-empty row vector is required"));
                }
                Bound::Vector(values.into_iter().map(|v| element_type.cast(v)).collect())
            }
            ParamKind::Neighborhood => match args.read_array(handle)? {
                None => Bound::Neighborhood {
                    weights: centre_zero_cube(rank),
                    half_size: vec![1; rank],
                },
                Some(array) => neighborhood(spec.name, &array, rank)?,
            },
        };
        Ok(bound)
    }

    pub fn value(&self, name: &str) -> Option<&Bound> {
        self.values.get(name)
    }

    fn get(&self, name: &str) -> Result<&Bound> {
        self.values
            .get(name)
            .ok_or_else(|| FilterError::malformed(name, "not bound for this operation"))
    }

    pub fn scalar(&self, name: &str) -> Result<f64> {
        match self.get(name)? {
            Bound::Scalar(value) => Ok(*value),
            Bound::Count(count) => Ok(*count as f64),
            Bound::Flag(flag) => Ok(f64::from(u8::from(*flag))),
            other => Err(unexpected(name, "a scalar", other)),
        }
    }

    pub fn count(&self, name: &str) -> Result<usize> {
        match self.get(name)? {
            Bound::Count(count) => Ok(*count),
            other => Err(unexpected(name, "a count", other)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name)? {
            Bound::Flag(flag) => Ok(*flag),
            other => Err(unexpected(name, "a flag", other)),
        }
    }

    pub fn vector(&self, name: &str) -> Result<&[f64]> {
        match self.get(name)? {
            Bound::Vector(values) => Ok(values),
            other => Err(unexpected(name, "a vector", other)),
        }
    }

    pub fn counts(&self, name: &str) -> Result<&[usize]> {
        match self.get(name)? {
            Bound::Counts(values) => Ok(values),
            other => Err(unexpected(name, "per-axis counts", other)),
        }
    }

    pub fn neighborhood(&self, name: &str) -> Result<(&[f64], &[usize])> {
        match self.get(name)? {
            Bound::Neighborhood { weights, half_size } => Ok((weights, half_size)),
            other => Err(unexpected(name, "a neighbourhood", other)),
        }
    }
}

fn unexpected(name: &str, expected: &str, got: &Bound) -> FilterError {
    FilterError::malformed(name, format!("bound as {got:?}, expected {expected}"))
}

fn centre_zero_cube(rank: usize) -> Vec<f64> {
    let len = 3usize.pow(rank as u32);
    let mut weights = vec![1.0; len];
    weights[len / 2] = 0.0;
    weights
}

fn neighborhood(name: &str, array: &AnyArray, rank: usize) -> Result<Bound> {
    if array.ndim() != rank {
        return Err(FilterError::malformed(
            name,
            format!("expected an array with {rank} dimensions, got {}", array.ndim()),
        ));
    }
    if let Some(extent) = array.shape().iter().find(|&&n| n % 2 == 0) {
        return Err(FilterError::malformed(
            name,
            format!("every extent must be odd, got {extent}"),
        ));
    }
    Ok(Bound::Neighborhood {
        weights: array.to_f64_vec(),
        half_size: array.shape().iter().map(|n| (n - 1) / 2).collect(),
    })
}

/// Everything a runner needs for one call
pub struct Invocation<'a> {
    pub descriptor: &'static OperationDescriptor,
    pub image: &'a AnyArray,
    pub header: &'a ImageHeader,
    pub params: ParameterBinding,
}

impl Invocation<'_> {
    pub fn grid(&self) -> Grid {
        Grid::new(&self.header.extents, &self.header.spacing)
    }

    fn extents(&self) -> &[usize] {
        &self.header.extents
    }

    /// Builds an array of the input element type from f64 values.
    fn like_input(&self, values: Vec<f64>) -> Result<AnyArray> {
        AnyArray::from_f64(self.header.element_type, self.extents(), values)
    }

    fn scale_range(&self) -> Result<ScaleRange> {
        let sigma_min = self.params.scalar("SIGMAMIN")?;
        let sigma_max = self.params.scalar("SIGMAMAX")?;
        if !(sigma_min.is_finite() && sigma_min > 0.0) {
            return Err(FilterError::malformed("SIGMAMIN", format!("must be positive, got {sigma_min}")));
        }
        if !sigma_max.is_finite() || sigma_max < sigma_min {
            return Err(FilterError::malformed(
                "SIGMAMAX",
                format!("must be at least SIGMAMIN ({sigma_min}), got {sigma_max}"),
            ));
        }
        Ok(ScaleRange {
            sigma_min,
            sigma_max,
            steps: self.params.count("NUMSIGMASTEPS")?,
            logarithmic: self.params.flag("ISSIGMASTEPLOG")?,
        })
    }
}

/// A written output
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: &'static str,
    pub data: AnyArray,
}

/// Collects the declared outputs of one call. Every output must be written
/// exactly once with its declared element type and shape.
pub struct OutputSink {
    filter: &'static str,
    specs: &'static [OutputSpec],
    input_type: ElementType,
    extents: Vec<usize>,
    slots: Vec<Option<AnyArray>>,
    nargout: usize,
}

impl OutputSink {
    pub fn new(descriptor: &OperationDescriptor, header: &ImageHeader, nargout: Option<usize>) -> Result<Self> {
        let declared = descriptor.outputs.len();
        let nargout = nargout.unwrap_or(declared);
        if nargout > declared {
            return Err(FilterError::ArgumentCount(format!(
                "{} returns at most {declared} outputs, {nargout} requested",
                descriptor.canonical_name()
            )));
        }
        Ok(Self {
            filter: descriptor.canonical_name(),
            specs: descriptor.outputs,
            input_type: header.element_type,
            extents: header.extents.clone(),
            slots: vec![None; declared],
            nargout,
        })
    }

    pub fn write(&mut self, name: &str, data: AnyArray) -> Result<()> {
        let Some(slot) = self.specs.iter().position(|spec| spec.name == name) else {
            return Err(self.failure(format!("wrote undeclared output {name}")));
        };
        let spec = self.specs[slot];
        let expected_type = spec.element.resolve(self.input_type);
        if data.element_type() != expected_type {
            return Err(self.failure(format!(
                "output {name} has type {}, expected {expected_type}",
                data.element_type()
            )));
        }
        let mut expected_shape = Vec::with_capacity(self.extents.len() + 1);
        if spec.element == OutputElement::OffsetVectors {
            expected_shape.push(self.extents.len());
        }
        expected_shape.extend_from_slice(&self.extents);
        if data.shape() != expected_shape.as_slice() {
            return Err(self.failure(format!(
                "output {name} has shape {:?}, expected {expected_shape:?}",
                data.shape()
            )));
        }
        if self.slots[slot].is_some() {
            return Err(FilterError::DuplicateOutput(spec.name));
        }
        self.slots[slot] = Some(data);
        Ok(())
    }

    /// The first `nargout` outputs in declared order.
    pub fn finish(self) -> Result<Vec<Output>> {
        let mut outputs = Vec::with_capacity(self.specs.len());
        for (spec, slot) in self.specs.iter().zip(self.slots) {
            let data = slot.ok_or(FilterError::MissingOutput(spec.name))?;
            outputs.push(Output { name: spec.name, data });
        }
        outputs.truncate(self.nargout);
        Ok(outputs)
    }

    fn failure(&self, reason: String) -> FilterError {
        FilterError::Algorithm {
            filter: self.filter,
            reason,
        }
    }
}

fn flat<T: Pixel>(array: &ArrayD<T>) -> Vec<T> {
    array.iter().copied().collect()
}

fn shaped<T: Pixel>(shape: &[usize], data: Vec<T>) -> Result<AnyArray> {
    Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?.into())
}

fn single(shape: &[usize], values: Vec<f64>) -> Result<AnyArray> {
    shaped(shape, values.into_iter().map(|v| v as f32).collect())
}

fn offsets_shape(extents: &[usize]) -> Vec<usize> {
    let mut shape = vec![extents.len()];
    shape.extend_from_slice(extents);
    shape
}

pub fn run_skeletonize(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let object: Vec<bool> = with_any_array!(inv.image, a => a.iter().map(|v| v.is_foreground()).collect());
    let skeleton = thinning::thin(&object, &inv.grid());
    let values = skeleton.into_iter().map(|v| f64::from(u8::from(v))).collect();
    sink.write("B", inv.like_input(values)?)
}

pub fn run_danielsson(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let grid = inv.grid();
    let (distance, voronoi, offsets) = with_any_array!(inv.image, a => {
        let maps = distance::danielsson(&flat(a), &grid);
        (maps.distance, shaped(inv.extents(), maps.voronoi)?, maps.offsets)
    });
    sink.write("B", shaped(inv.extents(), distance)?)?;
    sink.write("V", voronoi)?;
    sink.write("W", shaped(&offsets_shape(inv.extents()), offsets)?)
}

pub fn run_signed_danielsson(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let grid = inv.grid();
    let (distance, voronoi, offsets) = with_any_array!(inv.image, a => {
        let maps = distance::signed_danielsson(&flat(a), &grid);
        (maps.distance, shaped(inv.extents(), maps.voronoi)?, maps.offsets)
    });
    sink.write("B", single(inv.extents(), distance)?)?;
    sink.write("V", voronoi)?;
    sink.write("W", shaped(&offsets_shape(inv.extents()), offsets)?)
}

pub fn run_signed_maurer(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let grid = inv.grid();
    let distance = with_any_array!(inv.image, a => distance::signed_maurer(&flat(a), &grid));
    sink.write("B", single(inv.extents(), distance)?)
}

pub fn run_approximate_signed_distance(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let grid = inv.grid();
    let distance = with_any_array!(inv.image, a => distance::approximate_signed(&flat(a), &grid));
    sink.write("B", single(inv.extents(), distance)?)
}

pub fn run_dilate(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let radius = inv.params.count("RADIUS")?;
    let foreground = inv.params.scalar("FOREGROUND")?;
    let grid = inv.grid();
    let out = with_any_array!(inv.image, a => {
        shaped(inv.extents(), morphology::dilate(&flat(a), &grid, radius, Pixel::from_f64(foreground)))?
    });
    sink.write("B", out)
}

pub fn run_erode(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let radius = inv.params.count("RADIUS")?;
    let foreground = inv.params.scalar("FOREGROUND")?;
    let grid = inv.grid();
    let out = with_any_array!(inv.image, a => {
        shaped(inv.extents(), morphology::erode(&flat(a), &grid, radius, Pixel::from_f64(foreground)))?
    });
    sink.write("B", out)
}

pub fn run_vessel_diffusion(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let params = DiffusionParams {
        scales: inv.scale_range()?,
        iterations: inv.params.count("NUMITERATIONS")?,
        strength: inv.params.scalar("WSTRENGTH")?,
        sensitivity: inv.params.scalar("SENSITIVITY")?,
        time_step: inv.params.scalar("TIMESTEP")?,
        epsilon: inv.params.scalar("EPSILON")?,
    };
    let enhanced = diffusion::vessel_enhancing_diffusion(&inv.image.to_f64_vec(), &inv.grid(), &params);
    sink.write("B", inv.like_input(enhanced)?)
}

pub fn run_hessian_vesselness(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let scales = inv.scale_range()?;
    let measure = hessian::vesselness(&inv.image.to_f64_vec(), &inv.grid(), &scales);
    sink.write("B", shaped(inv.extents(), measure)?)
}

pub fn run_median(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let radius = inv.params.counts("RADIUS")?;
    let grid = inv.grid();
    let out = with_any_array!(inv.image, a => shaped(inv.extents(), median::median(&flat(a), &grid, radius))?);
    sink.write("B", out)
}

pub fn run_mrf(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let centroids = inv.params.vector("MU")?.to_vec();
    if centroids.len() > MAX_CLASSES {
        return Err(FilterError::malformed(
            "MU",
            format!("at most {MAX_CLASSES} classes are supported, got {}", centroids.len()),
        ));
    }
    let (weights, half_size) = inv.params.neighborhood("WEIGHTS")?;
    let params = MrfParams {
        centroids,
        weights: weights.to_vec(),
        half_size: half_size.to_vec(),
        smoothing: inv.params.scalar("SMOOTH")?,
        max_iterations: inv.params.count("NITER")?,
        tolerance: inv.params.scalar("TOL")?,
    };
    let labels = mrf::classify(&inv.image.to_f64_vec(), &inv.grid(), &params);
    sink.write("B", shaped(inv.extents(), labels)?)
}

pub fn run_voting_hole_fill(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let radius = inv.params.counts("RADIUS")?;
    let max_iterations = inv.params.count("MAXITER")?;
    let majority_threshold = inv.params.count("THR")?;
    let background = inv.params.scalar("BACKGROUND")?;
    let foreground = inv.params.scalar("FOREGROUND")?;
    let grid = inv.grid();
    let out = with_any_array!(inv.image, a => {
        let params = VotingParams {
            max_iterations,
            majority_threshold,
            background: Pixel::from_f64(background),
            foreground: Pixel::from_f64(foreground),
        };
        shaped(inv.extents(), hole_fill::voting_hole_fill(&flat(a), &grid, radius, params))?
    });
    sink.write("B", out)
}

pub fn run_canny(inv: &Invocation<'_>, sink: &mut OutputSink) -> Result<()> {
    let params = CannyParams {
        variance: inv.params.vector("VAR")?.to_vec(),
        upper: inv.params.scalar("UPPTHR")?,
        lower: inv.params.scalar("LOWTHR")?,
        max_error: inv.params.vector("MAXERR")?.to_vec(),
    };
    let maps = canny::canny(&inv.image.to_f64_vec(), &inv.grid(), &params);
    sink.write("B", inv.like_input(maps.edges)?)?;
    sink.write("C", inv.like_input(maps.suppressed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args::Value, catalog::lookup};

    fn header(shape: &[usize], element_type: ElementType) -> ImageHeader {
        let data = AnyArray::from_f64(element_type, shape, vec![0.0; shape.iter().product()]).unwrap();
        ImageHeader::from_array(&data).unwrap()
    }

    fn bind(filter: &str, header: &ImageHeader, positional: Vec<Value>) -> Result<ParameterBinding> {
        let mut args = ArgumentRegistry::new(positional, BTreeMap::new());
        args.register(0, "TYPE");
        args.register(1, "A");
        ParameterBinding::bind(lookup(filter).unwrap(), &mut args, header)
    }

    #[test]
    fn canny_thresholds_default_to_the_type_range() {
        let header = header(&[4, 4], ElementType::Single);
        let binding = bind("canny", &header, vec![]).unwrap();
        assert_eq!(binding.scalar("UPPTHR").unwrap(), f32::MAX as f64);
        assert_eq!(binding.scalar("LOWTHR").unwrap(), (f32::MAX / 2.0) as f64);
        assert_eq!(binding.vector("VAR").unwrap(), &[0.0, 0.0]);
        assert_eq!(binding.vector("MAXERR").unwrap(), &[0.01, 0.01]);

        let positional = vec![Value::Empty, Value::Empty, Value::Empty, Value::from(10.0)];
        let binding = bind("canny", &header, positional).unwrap();
        assert_eq!(binding.scalar("LOWTHR").unwrap(), 5.0);
    }

    #[test]
    fn pixel_values_are_cast_to_the_input_type() {
        let header = header(&[3, 3], ElementType::Uint8);
        let positional = vec![Value::Empty, Value::Empty, Value::from(1.9), Value::from(300.0)];
        let binding = bind("bwdilate", &header, positional).unwrap();
        assert_eq!(binding.count("RADIUS").unwrap(), 1);
        assert_eq!(binding.scalar("FOREGROUND").unwrap(), 255.0);
    }

    #[test]
    fn mrf_requires_centroids_and_defaults_the_cube() {
        let header = header(&[3, 3, 3], ElementType::Int16);
        assert!(bind("mrf", &header, vec![]).is_err());

        let positional = vec![Value::Empty, Value::Empty, Value::from(vec![0.0, 100.5])];
        let binding = bind("mrf", &header, positional).unwrap();
        assert_eq!(binding.vector("MU").unwrap(), &[0.0, 100.0]);
        let (weights, half) = binding.neighborhood("WEIGHTS").unwrap();
        assert_eq!(weights.len(), 27);
        assert_eq!(weights[13], 0.0);
        assert_eq!(half, &[1, 1, 1]);
    }

    #[test]
    fn neighbourhood_weights_must_match_rank_and_be_odd() {
        let header = header(&[4, 4], ElementType::Double);
        let even = ArrayD::<f64>::ones(IxDyn(&[2, 3]));
        let positional = vec![Value::Empty, Value::Empty, Value::from(vec![1.0]), Value::from(even)];
        assert!(bind("mrf", &header, positional).is_err());

        let wrong_rank = ArrayD::<f64>::ones(IxDyn(&[3, 3, 3]));
        let positional = vec![Value::Empty, Value::Empty, Value::from(vec![1.0]), Value::from(wrong_rank)];
        assert!(bind("mrf", &header, positional).is_err());

        let wide = ArrayD::<f64>::ones(IxDyn(&[5, 3]));
        let positional = vec![Value::Empty, Value::Empty, Value::from(vec![1.0]), Value::from(wide)];
        let binding = bind("mrf", &header, positional).unwrap();
        assert_eq!(binding.neighborhood("WEIGHTS").unwrap().1, &[2, 1]);
    }

    #[test]
    fn per_axis_parameters_need_one_value_per_axis() {
        let header = header(&[4, 4, 4], ElementType::Int32);
        let positional = vec![Value::Empty, Value::Empty, Value::from(vec![1.0, 1.0])];
        assert!(matches!(
            bind("median", &header, positional),
            Err(FilterError::MalformedParameter { .. })
        ));
        let positional = vec![Value::Empty, Value::Empty, Value::from(2.0)];
        assert!(bind("median", &header, positional).is_err());
    }

    #[test]
    fn undeclared_named_parameters_are_malformed() {
        let header = header(&[4, 4], ElementType::Double);
        let mut named = BTreeMap::new();
        named.insert("RADIOUS".to_string(), Value::from(1.0));
        let mut args = ArgumentRegistry::new(vec![], named);
        args.register(0, "TYPE");
        args.register(1, "A");
        let err = ParameterBinding::bind(lookup("bwerode").unwrap(), &mut args, &header).unwrap_err();
        assert!(err.to_string().contains("RADIOUS"));
    }

    #[test]
    fn outputs_are_checked_and_written_once() {
        let descriptor = lookup("dandist").unwrap();
        let header = header(&[2, 2], ElementType::Uint8);
        assert!(OutputSink::new(descriptor, &header, Some(4)).is_err());

        let mut sink = OutputSink::new(descriptor, &header, Some(1)).unwrap();
        let wrong = AnyArray::from_f64(ElementType::Single, &[2, 2], vec![0.0; 4]).unwrap();
        assert!(sink.write("B", wrong).is_err());
        let distance = AnyArray::from_f64(ElementType::Double, &[2, 2], vec![0.0; 4]).unwrap();
        sink.write("B", distance.clone()).unwrap();
        assert!(matches!(
            sink.write("B", distance),
            Err(FilterError::DuplicateOutput("B"))
        ));
        let voronoi = AnyArray::from_f64(ElementType::Uint8, &[2, 2], vec![0.0; 4]).unwrap();
        sink.write("V", voronoi).unwrap();
        let offsets = AnyArray::from_f64(ElementType::Int64, &[2, 2, 2], vec![0.0; 8]).unwrap();
        sink.write("W", offsets).unwrap();
        let outputs = sink.finish().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "B");
    }

    #[test]
    fn unwritten_outputs_fail_the_call() {
        let descriptor = lookup("canny").unwrap();
        let header = header(&[2, 2], ElementType::Double);
        let mut sink = OutputSink::new(descriptor, &header, None).unwrap();
        let data = AnyArray::from_f64(ElementType::Double, &[2, 2], vec![0.0; 4]).unwrap();
        sink.write("B", data).unwrap();
        assert!(matches!(sink.finish(), Err(FilterError::MissingOutput("C"))));
    }
}
