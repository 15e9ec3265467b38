//! Tests for fits that are rejected or fail

use super::common::synthetic;
use globfit::{apply_models, fit, Dataset, FitError, FitOptions, FittingContext, ModelRegistry};
use ndarray::{array, Array1};

#[test]
fn test_missing_parameters() {
    let registry = ModelRegistry::builtin();
    let mut matrix = synthetic(2, 4, 3.0, |x, _| x);
    apply_models(&mut matrix, registry, &FittingContext::span(0, 0), &[1]).unwrap();

    let err = fit(&mut matrix, registry, &FittingContext::all(), FitOptions::default()).unwrap_err();
    assert!(matches!(err, FitError::UninitializedParameters { dataset: 1 }));
    assert!(!matrix.get(0).unwrap().fit.fit_failed);
}

#[test]
fn test_unequal_lengths_change_nothing() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(1, 6, 5.0, |x, _| x);
    matrix.push(Dataset::new(Array1::linspace(0.0, 5.0, 5), Array1::zeros(5)));
    apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();
    let before: Vec<_> = matrix.iter().map(|d| d.fit.clone()).collect();

    let err = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        FitError::ShapeMismatch {
            dataset: 1,
            expected: 6,
            found: 5
        }
    ));
    let after: Vec<_> = matrix.iter().map(|d| d.fit.clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_bad_links() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(2, 4, 3.0, |x, _| x);
    apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();

    matrix.get_mut(1).unwrap().fit.links[0] = Some("Slope_1_3".to_string());
    let err = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap_err();
    assert!(matches!(err, FitError::LinkingScheme { .. }));

    // a cycle between the two slopes
    matrix.get_mut(1).unwrap().fit.links[0] = Some("Slope_1_1".to_string());
    matrix.get_mut(0).unwrap().fit.links[0] = Some("Slope_1_2 * 2".to_string());
    let err = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap_err();
    assert!(matches!(err, FitError::LinkingScheme { .. }));
    assert!(matrix.iter().all(|d| !d.fit.fit_failed));
}

#[test]
fn test_exhausted_budget_sets_sentinels() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(2, 8, 7.0, |x, _| 2.0 * (-x / 3.0).exp());
    apply_models(&mut matrix, registry, &ctx, &[2]).unwrap();

    let err = fit(&mut matrix, registry, &ctx, FitOptions::default().with_max_evaluations(2))
        .unwrap_err();
    let FitError::SolverFailure(reason) = err else {
        panic!("expected a solver failure");
    };
    assert!(reason.contains("maximum number of function evaluations"));

    for dataset in matrix.iter() {
        assert!(dataset.fit.fit_failed);
        assert_eq!(dataset.fit.failure_reason.as_deref(), Some(reason.as_str()));
        // two datasets of two parameters each
        assert_eq!(dataset.fit.parameters, vec![-1.0; 4]);
        assert_eq!(dataset.fit.errors, vec![-1.0; 4]);
        assert_eq!(dataset.model.x, array![0.0, 7.0]);
        assert_eq!(dataset.model.y, array![2.0, 2.0 * (-7.0f64 / 3.0).exp()]);
        assert!(dataset.model.z.is_empty());
    }
}

#[test]
fn test_failed_range_needs_models_reapplied() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(2, 8, 7.0, |x, _| 2.0 * (-x / 3.0).exp());
    apply_models(&mut matrix, registry, &ctx, &[2]).unwrap();
    fit(&mut matrix, registry, &ctx, FitOptions::default().with_max_evaluations(2)).unwrap_err();

    let err = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap_err();
    assert!(matches!(err, FitError::InvalidParameters(_)));

    apply_models(&mut matrix, registry, &ctx, &[2]).unwrap();
    for dataset in matrix.iter() {
        assert!(!dataset.fit.fit_failed);
        assert_eq!(dataset.fit.parameters.len(), 2);
    }
    fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap();
}

#[test]
fn test_single_point_failure_has_empty_curve() {
    let registry = ModelRegistry::builtin();
    let ctx = FittingContext::all();
    let mut matrix = synthetic(1, 1, 0.0, |_, _| 1.0);
    apply_models(&mut matrix, registry, &ctx, &[1]).unwrap();

    fit(&mut matrix, registry, &ctx, FitOptions::default().with_max_evaluations(1)).unwrap_err();
    let dataset = matrix.get(0).unwrap();
    assert!(dataset.fit.fit_failed);
    assert!(dataset.model.x.is_empty());
    assert!(dataset.model.y.is_empty());
}

#[test]
fn test_range_errors() {
    let registry = ModelRegistry::builtin();
    let mut matrix = synthetic(2, 4, 3.0, |x, _| x);
    apply_models(&mut matrix, registry, &FittingContext::all(), &[1]).unwrap();

    let err = fit(&mut matrix, registry, &FittingContext::span(1, 5), FitOptions::default())
        .unwrap_err();
    assert!(matches!(err, FitError::DatasetOutOfRange { count: 2, .. }));

    let err = fit(&mut matrix, registry, &FittingContext::span(1, 0), FitOptions::default())
        .unwrap_err();
    assert!(matches!(err, FitError::EmptyRange));
}
