//! Tests for link expressions between parameters

use approx::assert_relative_eq;
use globfit::parameters::{Bounds, Parameter, Parameters, ParameterError};

fn linked(name: &str, expr: &str) -> Parameter {
    let mut param = Parameter::new(name, 0.0);
    param.set_expr(Some(expr));
    param
}

#[test]
fn test_chained_links_follow_free_values() {
    let mut params = Parameters::new();
    // declared before the parameters they depend on
    params.add(linked("c", "b + 1")).unwrap();
    params.add(linked("b", "a * 2")).unwrap();
    params.add(Parameter::new("a", 1.0)).unwrap();
    params.resolve_links().unwrap();

    assert_eq!(params.varying_count(), 1);
    params.update_from_internal(&[3.0]).unwrap();
    assert_eq!(params.get("a").unwrap().value(), 3.0);
    assert_eq!(params.get("b").unwrap().value(), 6.0);
    assert_eq!(params.get("c").unwrap().value(), 7.0);
}

#[test]
fn test_unknown_and_circular_links() {
    let mut params = Parameters::new();
    params.add(Parameter::new("a", 1.0)).unwrap();
    params.add(linked("b", "missing * 2")).unwrap();
    assert!(matches!(
        params.resolve_links(),
        Err(ParameterError::ParameterNotFound { .. })
    ));

    let mut params = Parameters::new();
    params.add(linked("a", "b")).unwrap();
    params.add(linked("b", "a + 1")).unwrap();
    assert!(matches!(
        params.resolve_links(),
        Err(ParameterError::CircularDependency { .. })
    ));
}

#[test]
fn test_linked_value_respects_its_bounds() {
    let mut params = Parameters::new();
    params.add(Parameter::new("a", 5.0)).unwrap();
    let mut capped = Parameter::with_bounds("b", 0.0, Bounds::new(0.0, 4.0).unwrap());
    capped.set_expr(Some("a"));
    params.add(capped).unwrap();

    params.update_expressions().unwrap();
    assert_eq!(params.get("b").unwrap().value(), 4.0);
}

#[test]
fn test_fixed_parameters_are_not_varied() {
    let mut params = Parameters::new();
    let mut fixed = Parameter::new("a", 2.0);
    fixed.vary = false;
    params.add(fixed).unwrap();
    params.add(Parameter::new("b", 1.0)).unwrap();

    assert_eq!(params.varying_indices(), vec![1]);
    assert!(matches!(
        params.update_from_internal(&[1.0, 2.0]),
        Err(ParameterError::ValueCount { .. })
    ));
}

#[test]
fn test_sensitivity_through_links() {
    let mut params = Parameters::new();
    params.add(Parameter::new("a", 1.5)).unwrap();
    params.add(linked("b", "a * 2")).unwrap();
    let mut fixed = Parameter::new("c", 4.0);
    fixed.vary = false;
    params.add(fixed).unwrap();
    params.resolve_links().unwrap();

    let internal = params.varying_internal_values().unwrap();
    let sens = params.external_sensitivity(&internal.to_vec()).unwrap();
    assert_eq!(sens.dim(), (3, 1));
    assert_relative_eq!(sens[[0, 0]], 1.0, epsilon = 1e-12);
    assert_relative_eq!(sens[[1, 0]], 2.0, epsilon = 1e-6);
    assert_eq!(sens[[2, 0]], 0.0);
}
