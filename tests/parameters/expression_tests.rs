//! Tests for Expression parsing and evaluation

use approx::assert_relative_eq;
use globfit::parameters::{Expression, SimpleContext};

fn eval(text: &str, x: f64, p: &[f64]) -> f64 {
    let mut ctx = SimpleContext::new();
    ctx.set_variable("X", x);
    ctx.set_array("P", p.to_vec());
    Expression::parse(text).unwrap().evaluate(&ctx).unwrap()
}

#[test]
fn test_model_formula_with_prefix() {
    let value = eval("Y=P[0]*exp(-X/P[1])", 2.0, &[3.0, 2.0]);
    assert_relative_eq!(value, 3.0 * (-1.0f64).exp(), epsilon = 1e-12);
}

#[test]
fn test_functions() {
    assert_relative_eq!(eval("lambertw(1)", 0.0, &[]), 0.567_143_290_409_783_8, epsilon = 1e-12);
    assert_eq!(eval("max(1, X, 3)", 5.0, &[]), 5.0);
    assert_eq!(eval("min(4, 2)", 0.0, &[]), 2.0);
    assert_relative_eq!(eval("log10(1000)", 0.0, &[]), 3.0, epsilon = 1e-12);
    assert_relative_eq!(eval("pow(P[0], 0.5)", 0.0, &[9.0]), 3.0, epsilon = 1e-12);
    assert_relative_eq!(eval("cos(pi)", 0.0, &[]), -1.0, epsilon = 1e-12);
}

#[test]
fn test_ieee_division() {
    assert!(eval("1/X", 0.0, &[]).is_infinite());
    assert!(eval("X/X", 0.0, &[]).is_nan());
}

#[test]
fn test_display_round_trip() {
    let expr = Expression::parse("P[2]+(P[3]-P[2])/(1+(P[0]/X)^P[1])").unwrap();
    let reparsed = Expression::parse(&expr.to_string()).unwrap();

    let mut ctx = SimpleContext::new();
    ctx.set_variable("X", 30.0);
    ctx.set_array("P", vec![60.0, 1.5, 0.1, 2.0]);
    assert_eq!(expr.evaluate(&ctx).unwrap(), reparsed.evaluate(&ctx).unwrap());
}

#[test]
fn test_link_variables() {
    let expr = Expression::parse("2 * kd_2_1 + Rmax_1_1 / pi").unwrap();
    // constants are reported too; link resolution skips them
    assert_eq!(expr.variables(), vec!["Rmax_1_1", "kd_2_1", "pi"]);
}
