//! Tests for composing catalog models and applying them to datasets

use super::common::synthetic;
use approx::assert_relative_eq;
use globfit::{apply_models, ComposedModel, Coordinates, FitError, FittingContext, ModelRegistry};
use ndarray::Array1;

#[test]
fn test_composite_is_sum_of_parts() {
    let registry = ModelRegistry::builtin();
    let linear = ComposedModel::compose(registry, &[27]).unwrap();
    let decay = ComposedModel::compose(registry, &[2]).unwrap();
    let both = ComposedModel::compose(registry, &[27, 2]).unwrap();
    assert_eq!(both.parameter_count(), linear.parameter_count() + decay.parameter_count());

    let x = Array1::linspace(0.0, 5.0, 11);
    let coords = Coordinates::from_x(x.view());
    let sum = linear.evaluate(&[0.3, -1.0], &coords).unwrap()
        + decay.evaluate(&[4.0, 1.5], &coords).unwrap();
    let composite = both.evaluate(&[0.3, -1.0, 4.0, 1.5], &coords).unwrap();
    for (a, b) in composite.iter().zip(sum.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn test_script_and_formula_models_combine() {
    let registry = ModelRegistry::builtin();
    let model = ComposedModel::compose(registry, &[1, 14]).unwrap();
    assert_eq!(model.parameter_count(), 8);
    assert_eq!(model.slots()[1].identifier, "dG");
    assert_eq!(model.slots()[1].slot, 1);

    let x = Array1::linspace(0.0, 8.0, 9);
    let coords = Coordinates::from_x(x.view());
    let mut params = model.defaults();
    params[0] = 1.5;
    let with_offset = model.evaluate(&params, &coords).unwrap();

    let folding = ComposedModel::compose(registry, &[14]).unwrap();
    let alone = folding.evaluate(&params[1..], &coords).unwrap();
    for (a, b) in with_offset.iter().zip(alone.iter()) {
        assert_relative_eq!(*a, *b + params[0], epsilon = 1e-9);
    }
}

#[test]
fn test_reapplying_keeps_user_state() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(2, 5, 4.0, |x, _| x);

    apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();
    {
        let spec = &mut matrix.get_mut(1).unwrap().fit;
        spec.parameters[0] = 2.5;
        spec.free[1] = false;
        spec.links[0] = Some("Slope_1_1".to_string());
    }
    let before = matrix.get(1).unwrap().fit.clone();

    apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();
    assert_eq!(matrix.get(1).unwrap().fit, before);

    apply_models(&mut matrix, registry, &ctx, &[27, 1]).unwrap();
    let spec = &matrix.get(1).unwrap().fit;
    assert_eq!(spec.model_ids, vec![27, 1]);
    assert_eq!(spec.parameters, vec![1.0, 0.0, 0.0]);
    assert!(spec.free.iter().all(|&f| f));
    assert!(spec.links.iter().all(Option::is_none));
}

#[test]
fn test_apply_to_span_only() {
    let registry = ModelRegistry::builtin();
    let mut matrix = synthetic(3, 4, 3.0, |x, _| x);
    apply_models(&mut matrix, registry, &FittingContext::span(1, 2), &[2]).unwrap();

    assert!(matrix.get(0).unwrap().fit.parameters.is_empty());
    assert_eq!(matrix.get(2).unwrap().fit.model_ids, vec![2]);
    assert!(!matrix.get(1).unwrap().fit.formula.is_empty());
}

#[test]
fn test_unknown_model_changes_nothing() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(1, 4, 3.0, |x, _| x);
    apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();
    let before = matrix.get(0).unwrap().fit.clone();

    let err = apply_models(&mut matrix, registry, &ctx, &[27, 999]).unwrap_err();
    assert!(matches!(err, FitError::Compose(_)));
    assert_eq!(matrix.get(0).unwrap().fit, before);
}
