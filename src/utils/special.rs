//! Special functions needed by catalog models.

use std::f64::consts::E;

const MAX_HALLEY_ITERATIONS: usize = 64;

/// Principal branch of the Lambert W function, `W₀(x)`.
///
/// Solves `w * exp(w) = x` for `w ≥ -1` using Halley iteration. Defined for
/// `x ≥ -1/e`; returns NaN below the branch point and `+inf` for `+inf`.
pub fn lambert_w(x: f64) -> f64 {
    let branch_point = -1.0 / E;

    if x.is_nan() || x < branch_point - 1e-15 {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return f64::INFINITY;
    }
    if x == 0.0 {
        return 0.0;
    }
    if x <= branch_point {
        return -1.0;
    }

    let mut w = initial_guess(x);

    for _ in 0..MAX_HALLEY_ITERATIONS {
        let ew = w.exp();
        let f = w * ew - x;
        if f == 0.0 {
            break;
        }

        let wp1 = w + 1.0;
        let denominator = ew * wp1 - (w + 2.0) * f / (2.0 * wp1);
        if denominator == 0.0 || !denominator.is_finite() {
            break;
        }

        let dw = f / denominator;
        w -= dw;
        if dw.abs() <= 4.0 * f64::EPSILON * (1.0 + w.abs()) {
            break;
        }
    }

    w
}

fn initial_guess(x: f64) -> f64 {
    if x < -0.32 {
        // Series about the branch point
        let p = (2.0 * (E * x + 1.0)).sqrt();
        -1.0 + p - p * p / 3.0 + 11.0 / 72.0 * p * p * p
    } else if x < 3.0 {
        let l = x.ln_1p();
        l * (1.0 - (1.0 + l).ln() / (2.0 + l))
    } else {
        let l1 = x.ln();
        let l2 = l1.ln();
        l1 - l2 + l2 / l1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_values() {
        assert_eq!(lambert_w(0.0), 0.0);
        assert_relative_eq!(lambert_w(E), 1.0, epsilon = 1e-14);
        assert_relative_eq!(lambert_w(1.0), 0.567_143_290_409_783_8, epsilon = 1e-14);
        assert_relative_eq!(lambert_w(-1.0 / E), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_identity() {
        for &x in &[-0.367, -0.3, -0.1, 1e-8, 0.5, 2.0, 10.0, 1e3, 1e10, 1e100, 1e300] {
            let w = lambert_w(x);
            assert_relative_eq!(w * w.exp(), x, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_domain_edges() {
        assert!(lambert_w(-0.5).is_nan());
        assert!(lambert_w(f64::NAN).is_nan());
        assert_eq!(lambert_w(f64::INFINITY), f64::INFINITY);
    }
}
