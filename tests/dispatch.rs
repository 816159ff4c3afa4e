use imfilter::{
    AnyArray, AxisInfo, ElementType, FilterCall, FilterError, FilterKind, Value, Volume, catalog,
    invoke,
};
use ndarray::{ArrayD, IxDyn};
use strum::IntoEnumIterator;

fn zeros(element_type: ElementType, shape: &[usize]) -> AnyArray {
    AnyArray::from_f64(element_type, shape, vec![0.0; shape.iter().product()]).unwrap()
}

/// Smallest sensible call for each operation: only `mrf` has a required
/// parameter.
fn minimal_call(kind: FilterKind, image: AnyArray) -> FilterCall {
    let call = FilterCall::new(kind.short_name(), image);
    match kind {
        FilterKind::MarkovRandomField => call.named("MU", vec![0.0, 1.0]),
        _ => call,
    }
}

/// Text a rejection must contain to name the constraint that failed
fn expected_constraint(kind: FilterKind, rank: usize, element_type: ElementType) -> String {
    use FilterKind::*;
    let volume_only = matches!(kind, Skeletonize | VesselEnhancingDiffusion | HessianVesselness);
    if volume_only && rank != 3 {
        return "only accepts 3D input images".to_string();
    }
    if matches!(element_type, ElementType::Uint32 | ElementType::Uint64) {
        return format!("does not accept input images of type {element_type}");
    }
    match kind {
        CannyEdge => "floating type",
        VesselEnhancingDiffusion => "signed type",
        SignedMaurerDistance => "type boolean",
        _ => panic!("{kind} has no restriction on {rank}D {element_type}"),
    }
    .to_string()
}

#[test]
fn every_enabled_combination_runs_and_every_other_is_rejected() {
    for kind in FilterKind::iter() {
        let descriptor = catalog::descriptor(kind);
        for rank in 2..=4 {
            for element_type in ElementType::iter() {
                let image = zeros(element_type, &vec![3; rank]);
                let result = minimal_call(kind, image).run();
                if descriptor.supports(rank, element_type) {
                    let outputs = result.unwrap_or_else(|e| {
                        panic!("{kind} on {rank}D {element_type} failed: {e}")
                    });
                    assert_eq!(outputs.len(), descriptor.outputs.len());
                    for (output, spec) in outputs.iter().zip(descriptor.outputs) {
                        assert_eq!(output.name, spec.name);
                    }
                } else {
                    match result {
                        Err(FilterError::Unsupported { filter, reason }) => {
                            assert_eq!(filter, kind.canonical_name());
                            assert!(reason.starts_with(kind.canonical_name()), "{reason}");
                            let constraint = expected_constraint(kind, rank, element_type);
                            assert!(
                                reason.contains(&constraint),
                                "{kind} on {rank}D {element_type}: `{reason}` does not mention `{constraint}`"
                            );
                        }
                        other => panic!("{kind} on {rank}D {element_type}: expected rejection, got {other:?}"),
                    }
                }
            }
        }
    }
}

#[test]
fn unsupported_ranks_fail_for_every_operation() {
    for kind in FilterKind::iter() {
        for shape in [vec![4], vec![2; 5]] {
            let err = minimal_call(kind, zeros(ElementType::Double, &shape))
                .run()
                .unwrap_err();
            assert!(
                matches!(err, FilterError::InvalidImage(_)),
                "{kind} on shape {shape:?}: {err}"
            );
        }
    }
}

fn record(axes: Vec<AxisInfo>) -> Volume {
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 5]), vec![0u8, 0, 1, 1, 1]).unwrap();
    Volume { data: data.into(), axes }
}

fn assert_invalid_record(volume: Volume) {
    let err = invoke("maudist", volume, vec![]).unwrap_err();
    assert!(matches!(err, FilterError::InvalidImage(_)), "{err}");
}

#[test]
fn hand_built_records_with_missing_axes_are_rejected() {
    assert_invalid_record(record(vec![]));
    assert_invalid_record(record(vec![AxisInfo::unit(1)]));
}

#[test]
fn hand_built_records_with_mismatched_sizes_are_rejected() {
    assert_invalid_record(record(vec![AxisInfo::unit(9), AxisInfo::unit(9)]));
    assert_invalid_record(record(vec![AxisInfo::unit(1), AxisInfo::unit(4)]));
}

#[test]
fn hand_built_records_with_bad_spacing_or_origin_are_rejected() {
    for spacing in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let axes = vec![AxisInfo::unit(1), AxisInfo { size: 5, spacing, origin: 0.0 }];
        assert_invalid_record(record(axes));
    }
    let axes = vec![AxisInfo { size: 1, spacing: 1.0, origin: f64::NAN }, AxisInfo::unit(5)];
    assert_invalid_record(record(axes));
}

#[test]
fn well_formed_records_use_their_spacing() {
    let axes = vec![AxisInfo::unit(1), AxisInfo { size: 5, spacing: 2.0, origin: 0.0 }];
    let outputs = invoke("maudist", record(axes), vec![]).unwrap();
    let distance = outputs[0].data.as_array::<f32>().unwrap();
    assert_eq!(distance.iter().copied().collect::<Vec<_>>(), vec![4.0, 2.0, 0.0, -2.0, -4.0]);
}

#[test]
fn unknown_names_fail_before_anything_else() {
    let err = invoke("gaussian", Value::Empty, vec![Value::from("junk")]).unwrap_err();
    assert!(matches!(err, FilterError::InvalidFilter(ref name) if name == "gaussian"));
}

#[test]
fn canonical_names_dispatch_like_short_names() {
    let image = zeros(ElementType::Single, &[4, 4]);
    let short = invoke("median", image.clone(), vec![]).unwrap();
    let canonical = invoke("MedianImageFilter", image, vec![]).unwrap();
    assert_eq!(short, canonical);
}

#[test]
fn dilating_a_single_pixel_fills_its_neighbourhood() {
    let mut image = ArrayD::<u8>::zeros(IxDyn(&[5, 5]));
    image[[2, 2]] = 1;

    let outputs = invoke("bwdilate", image, vec![Value::from(1.0)]).unwrap();
    let dilated = outputs[0].data.as_array::<u8>().unwrap();

    for r in 0..5 {
        for c in 0..5 {
            let inside = (1..=3).contains(&r) && (1..=3).contains(&c);
            assert_eq!(dilated[[r, c]], u8::from(inside), "pixel ({r}, {c})");
        }
    }
}

#[test]
fn maurer_distance_of_an_empty_volume_is_infinite() {
    let outputs = invoke("maudist", zeros(ElementType::Uint8, &[4, 4, 4]), vec![]).unwrap();
    let distance = outputs[0].data.as_array::<f32>().unwrap();
    assert_eq!(distance.shape(), &[4, 4, 4]);
    assert!(distance.iter().all(|&d| d == f32::INFINITY));
}

#[test]
fn repeated_calls_return_identical_outputs() {
    let data: Vec<f64> = (0..125).map(|i| ((i * 37) % 11) as f64).collect();
    let image = ArrayD::from_shape_vec(IxDyn(&[5, 5, 5]), data).unwrap();

    let first = invoke("median", image.clone(), vec![Value::from(vec![1.0, 1.0, 1.0])]).unwrap();
    let second = invoke("median", image, vec![Value::from(vec![1.0, 1.0, 1.0])]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_arguments_and_omitted_arguments_bind_the_same_defaults() {
    let mut image = ArrayD::<i16>::zeros(IxDyn(&[6, 6]));
    image[[3, 3]] = 1;

    let omitted = invoke("bwerode", image.clone(), vec![]).unwrap();
    let empty = invoke("bwerode", image.clone(), vec![Value::Empty, Value::Empty]).unwrap();
    let explicit = invoke("bwerode", image, vec![Value::from(0.0), Value::from(1.0)]).unwrap();
    assert_eq!(omitted, empty);
    assert_eq!(omitted, explicit);
}

#[test]
fn canny_lower_threshold_defaults_to_half_the_upper() {
    let data: Vec<f64> = (0..64).map(|i| if i % 8 < 4 { 0.0 } else { 10.0 }).collect();
    let image = ArrayD::from_shape_vec(IxDyn(&[8, 8]), data).unwrap();

    let derived = FilterCall::new("canny", image.clone())
        .named("UPPTHR", 4.0)
        .run()
        .unwrap();
    let explicit = FilterCall::new("canny", image)
        .named("UPPTHR", 4.0)
        .named("LOWTHR", 2.0)
        .run()
        .unwrap();
    assert_eq!(derived, explicit);
}

#[test]
fn named_and_positional_parameters_are_interchangeable() {
    let mut image = ArrayD::<f32>::zeros(IxDyn(&[7, 7, 7]));
    image[[3, 3, 3]] = 1.0;

    let positional = invoke("bwdilate", image.clone(), vec![Value::from(2.0)]).unwrap();
    let named = FilterCall::new("bwdilate", image).named("RADIUS", 2.0).run().unwrap();
    assert_eq!(positional, named);
}

#[test]
fn undeclared_named_parameters_are_malformed() {
    let err = FilterCall::new("median", zeros(ElementType::Double, &[3, 3]))
        .named("SIGMA", 1.0)
        .run()
        .unwrap_err();
    assert!(matches!(err, FilterError::MalformedParameter { ref name, .. } if name == "SIGMA"));
}

#[test]
fn mrf_needs_centroids() {
    let err = invoke("mrf", zeros(ElementType::Double, &[4, 4]), vec![]).unwrap_err();
    assert!(matches!(err, FilterError::ArgumentCount(_)));

    let err = invoke("mrf", zeros(ElementType::Double, &[4, 4]), vec![Value::Empty]).unwrap_err();
    assert!(matches!(err, FilterError::MalformedParameter { ref name, .. } if name == "MU"));
}

#[test]
fn rejections_carry_the_operation_specific_message() {
    let err = invoke("advess", zeros(ElementType::Uint8, &[3, 3, 3]), vec![]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "AnisotropicDiffusionVesselEnhancementImageFilter only accepts input images with signed type"
    );

    let err = invoke("skel", zeros(ElementType::Logical, &[3, 3]), vec![]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "BinaryThinningImageFilter3D only accepts 3D input images"
    );

    let err = invoke("bwdilate", zeros(ElementType::Uint64, &[3, 3]), vec![]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "BinaryDilateImageFilter does not accept input images of type uint64"
    );
}

#[test]
fn outputs_follow_the_declared_element_types() {
    let image = zeros(ElementType::Int16, &[3, 3, 3]);
    let outputs = invoke("dandist", image.clone(), vec![]).unwrap();
    assert_eq!(outputs[0].data.element_type(), ElementType::Double);
    assert_eq!(outputs[1].data.element_type(), ElementType::Int16);

    let outputs = invoke("mrf", image, vec![Value::from(vec![0.0, 5.0])]).unwrap();
    assert_eq!(outputs[0].data.element_type(), ElementType::Uint8);
}
