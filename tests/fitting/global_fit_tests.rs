//! Tests for fits over several datasets at once

use super::common::synthetic;
use approx::assert_relative_eq;
use globfit::fit::{CancellationToken, NanPolicy};
use globfit::{apply_models, fit, regenerate, FitOptions, FittingContext, ModelRegistry};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_constant_fit_recovers_level() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(1, 20, 10.0, |_, _| 3.0);
    apply_models(&mut matrix, registry, &ctx, &[1]).unwrap();

    fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap();
    let spec = &matrix.get(0).unwrap().fit;
    assert!((spec.parameters[0] - 3.0).abs() < 1e-4);
    assert!(!spec.fit_failed);
    assert!(spec.failure_reason.is_none());
}

#[test]
fn test_linked_constants_share_one_value() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(2, 10, 9.0, |_, k| if k == 0 { 2.0 } else { 4.0 });
    apply_models(&mut matrix, registry, &ctx, &[1]).unwrap();
    matrix.get_mut(1).unwrap().fit.links[0] = Some("Add_Constant_1_1".to_string());

    let report = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap();
    assert_eq!(report.nvarys(), 1);
    assert_eq!(report.ndata(), 20);

    let first = matrix.get(0).unwrap().fit.parameters[0];
    let second = matrix.get(1).unwrap().fit.parameters[0];
    assert_eq!(first, second);
    // the squared objective balances both traces around their midpoint
    assert!((first - 3.0).abs() < 1e-3);

    let linked = report.parameter("Add_Constant_1_2").unwrap();
    assert_eq!(linked.expr.as_deref(), Some("Add_Constant_1_1"));
    assert!(!linked.vary);
}

#[test]
fn test_shared_time_constant() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let amplitudes = [1.0, 2.0, 3.0];
    let mut matrix = synthetic(3, 40, 8.0, |x, k| amplitudes[k] * (-x / 2.0).exp());
    apply_models(&mut matrix, registry, &ctx, &[2]).unwrap();
    for k in 1..3 {
        matrix.get_mut(k).unwrap().fit.links[1] = Some("Time_Constant_2_1".to_string());
    }

    let report = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap();
    assert_eq!(report.nvarys(), 4);

    for (k, amplitude) in amplitudes.iter().enumerate() {
        let spec = &matrix.get(k).unwrap().fit;
        assert_relative_eq!(spec.parameters[0], *amplitude, epsilon = 1e-3);
        assert_relative_eq!(spec.parameters[1], 2.0, epsilon = 1e-3);
        assert_eq!(spec.errors.len(), 2);
        let data = &matrix.get(k).unwrap().data;
        assert_eq!(matrix.get(k).unwrap().residuals.y.len(), data.y.len());
        assert!(spec.rsq > 0.999);
    }
}

#[test]
fn test_fixed_parameter_is_left_alone() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(1, 15, 7.0, |x, _| 0.5 * x + 1.0);
    apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();
    {
        let spec = &mut matrix.get_mut(0).unwrap().fit;
        spec.parameters[0] = 0.5;
        spec.free[0] = false;
    }

    let report = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap();
    let spec = &matrix.get(0).unwrap().fit;
    assert_eq!(spec.parameters[0], 0.5);
    assert_eq!(spec.errors[0], 0.0);
    assert!((spec.parameters[1] - 1.0).abs() < 1e-4);
    assert_eq!(report.nvarys(), 1);
    assert!(report.to_string().contains("(fixed)"));
}

#[test]
fn test_observer_sees_every_evaluation() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(1, 10, 9.0, |_, _| 1.5);
    apply_models(&mut matrix, registry, &ctx, &[1]).unwrap();

    let seen = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&seen);
    let options = FitOptions::default().with_observer(move |report| {
        assert!(report.sum_sq.is_finite());
        counter.set(counter.get() + 1);
    });
    let report = fit(&mut matrix, registry, &ctx, options).unwrap();

    assert!(seen.get() > 1);
    assert!(seen.get() <= report.nfev);
}

#[test]
fn test_fit_span_leaves_other_datasets() {
    let registry = ModelRegistry::builtin();
    let mut matrix = synthetic(3, 10, 9.0, |_, k| k as f64 + 1.0);
    apply_models(&mut matrix, registry, &FittingContext::all(), &[1]).unwrap();

    fit(&mut matrix, registry, &FittingContext::span(1, 2), FitOptions::default()).unwrap();
    assert_eq!(matrix.get(0).unwrap().fit.parameters, vec![0.0]);
    assert!(matrix.get(0).unwrap().model.x.is_empty());
    assert!((matrix.get(2).unwrap().fit.parameters[0] - 3.0).abs() < 1e-4);
}

#[test]
fn test_regenerate_statistics() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(2, 5, 4.0, |x, _| x);
    apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();
    // exact model for the first trace, the mean for the second
    matrix.get_mut(1).unwrap().fit.parameters = vec![0.0, 2.0];

    regenerate(&mut matrix, registry, &ctx, 50).unwrap();
    assert_eq!(matrix.get(0).unwrap().fit.rsq, 1.0);
    assert_eq!(matrix.get(0).unwrap().fit.chisq, 0.0);
    assert_relative_eq!(matrix.get(1).unwrap().fit.rsq, 0.0, epsilon = 1e-12);
    // SSR = 10, mean |r| = 6/5
    assert_relative_eq!(matrix.get(1).unwrap().fit.chisq, 10.0 / 1.2, epsilon = 1e-12);
}

#[test]
fn test_cancel_from_observer() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(1, 10, 9.0, |x, _| 2.0 * (-x / 3.0).exp());
    apply_models(&mut matrix, registry, &ctx, &[2]).unwrap();

    let token = CancellationToken::new();
    let trigger = token.clone();
    let options = FitOptions::default()
        .with_cancellation(token)
        .with_nan_policy(NanPolicy::Raise)
        .with_observer(move |_| trigger.cancel());

    let err = fit(&mut matrix, registry, &ctx, options).unwrap_err();
    assert_eq!(err.to_string(), "Fit failed: fit cancelled");
    assert!(matrix.get(0).unwrap().fit.fit_failed);
}
