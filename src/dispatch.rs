use std::collections::BTreeMap;

use tracing::{debug, info};
use web_time::Instant;

use crate::{
    args::{ArgumentRegistry, Value},
    catalog::{self, OperationDescriptor},
    error::{FilterError, Result},
    executor::{Invocation, Output, OutputSink, ParameterBinding},
    header::ImageHeader,
};

/// Runs `filter` on `image` with positional parameters, returning every
/// declared output.
///
/// ```
/// use imfilter::{invoke, Value};
/// use ndarray::{ArrayD, IxDyn};
///
/// let mut image = ArrayD::<u8>::zeros(IxDyn(&[5, 5]));
/// image[[2, 2]] = 1;
/// let outputs = invoke("bwdilate", image, vec![Value::from(1.0)]).unwrap();
/// let dilated = outputs[0].data.as_array::<u8>().unwrap();
/// assert_eq!(dilated.iter().filter(|&&v| v == 1).count(), 9);
/// ```
pub fn invoke(filter: &str, image: impl Into<Value>, params: Vec<Value>) -> Result<Vec<Output>> {
    let mut call = FilterCall::new(filter, image);
    for param in params {
        call = call.arg(param);
    }
    call.run()
}

/// Builder for one filter call with positional and named parameters.
#[derive(Debug, Clone)]
pub struct FilterCall {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
    nargout: Option<usize>,
}

impl FilterCall {
    pub fn new(filter: &str, image: impl Into<Value>) -> Self {
        Self {
            positional: vec![Value::from(filter), image.into()],
            named: BTreeMap::new(),
            nargout: None,
        }
    }

    /// Appends the next positional parameter. [`Value::Empty`] keeps the
    /// default for that position.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn named(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.named.insert(name.to_string(), value.into());
        self
    }

    /// Number of outputs to return, at most the number declared.
    pub fn nargout(mut self, nargout: usize) -> Self {
        self.nargout = Some(nargout);
        self
    }

    pub fn run(self) -> Result<Vec<Output>> {
        dispatch(ArgumentRegistry::new(self.positional, self.named), self.nargout)
    }
}

/// Resolves the descriptor for `filter` and checks that it is enabled for
/// the image's rank and element type.
pub fn resolve(filter: &str, header: &ImageHeader) -> Result<&'static OperationDescriptor> {
    let descriptor = catalog::lookup(filter)?;
    descriptor.check(header.rank, header.element_type)?;
    debug!(
        filter = descriptor.canonical_name(),
        rank = header.rank,
        element_type = %header.element_type,
        "resolved operation"
    );
    Ok(descriptor)
}

/// Validates, binds, executes and exports one call. The filter name is at
/// position 0 (`TYPE`) and the image at position 1 (`A`).
pub fn dispatch(mut args: ArgumentRegistry, nargout: Option<usize>) -> Result<Vec<Output>> {
    args.check_number_of_arguments(2, usize::MAX)?;
    let type_handle = args.register(0, "TYPE");
    let image_handle = args.register(1, "A");

    let filter = args.read_string(type_handle, "")?;
    let descriptor = catalog::lookup(&filter)?;

    let header = {
        let image_value = args
            .get(image_handle)?
            .ok_or_else(|| FilterError::InvalidImage("no input image given".to_string()))?;
        ImageHeader::inspect(image_value)?
    };
    resolve(descriptor.short_name(), &header)?;
    args.check_number_of_arguments(descriptor.min_arguments(), descriptor.max_arguments())?;

    let params = ParameterBinding::bind(descriptor, &mut args, &header)?;
    let image = match args.get(image_handle)? {
        Some(Value::Array(array)) => array,
        Some(Value::Volume(volume)) => &volume.data,
        _ => return Err(FilterError::InvalidImage("input image changed during binding".to_string())),
    };
    let mut sink = OutputSink::new(descriptor, &header, nargout)?;
    let invocation = Invocation {
        descriptor,
        image,
        header: &header,
        params,
    };

    info!(
        filter = descriptor.canonical_name(),
        shape = ?header.extents,
        element_type = %header.element_type,
        "running filter"
    );
    let start = Instant::now();
    (descriptor.run)(&invocation, &mut sink)?;
    info!(
        filter = descriptor.canonical_name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "filter finished"
    );
    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ElementType;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn unknown_filters_fail_before_the_image_is_read() {
        let err = FilterCall::new("blur", Value::from(3.0)).run().unwrap_err();
        assert!(matches!(err, FilterError::InvalidFilter(_)));
    }

    #[test]
    fn too_many_positional_arguments() {
        let image = ArrayD::<u8>::zeros(IxDyn(&[3, 3]));
        let err = invoke("bwdilate", image, vec![Value::from(1.0), Value::from(1.0), Value::from(1.0)])
            .unwrap_err();
        assert!(matches!(err, FilterError::ArgumentCount(_)));
    }

    #[test]
    fn image_records_supply_spacing() {
        let data = ArrayD::<f64>::from_shape_vec(IxDyn(&[1, 5]), vec![0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let mut volume = crate::volume::Volume::from_array(data.into());
        volume.axes[1].spacing = 2.0;
        let outputs = invoke("maudist", volume, vec![]).unwrap();
        let b = outputs[0].data.as_array::<f32>().unwrap();
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), vec![4.0, 2.0, 0.0, -2.0, -4.0]);
    }

    #[test]
    fn nargout_trims_the_returned_outputs() {
        let image = ArrayD::<i16>::zeros(IxDyn(&[3, 4]));
        let outputs = FilterCall::new("dandist", image.clone()).nargout(2).run().unwrap();
        assert_eq!(outputs.iter().map(|o| o.name).collect::<Vec<_>>(), vec!["B", "V"]);
        assert!(FilterCall::new("dandist", image).nargout(4).run().is_err());
    }

    #[test]
    fn resolve_reports_the_rejected_type() {
        let data: crate::array::AnyArray = ArrayD::<u32>::zeros(IxDyn(&[2, 2])).into();
        let header = ImageHeader::from_array(&data).unwrap();
        assert_eq!(header.element_type, ElementType::Uint32);
        let err = resolve("median", &header).err().unwrap();
        assert_eq!(err.to_string(), "MedianImageFilter does not accept input images of type uint32");
    }
}
