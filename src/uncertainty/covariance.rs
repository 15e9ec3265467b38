//! # Covariance Matrix Calculations
//!
//! Covariance, correlation and standard errors from the Jacobian returned by
//! the solver.

use crate::error::{FitError, Result};
use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};
use ndarray::{Array1, Array2};

/// Calculate the covariance matrix `redchi · inv(JᵀJ)`.
///
/// Fails with [`FitError::SingularMatrix`] when `JᵀJ` cannot be inverted,
/// e.g. when a parameter has no influence on the residuals.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Result<Array2<f64>> {
    let jtj = ndarray_to_nalgebra(&jacobian.t().dot(jacobian));

    let inverse = match jtj.clone().cholesky() {
        Some(chol) => chol.inverse(),
        None => jtj.try_inverse().ok_or(FitError::SingularMatrix)?,
    };
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(FitError::SingularMatrix);
    }

    Ok(nalgebra_to_ndarray(&inverse) * redchi)
}

/// Map a covariance through a first-order change of variables:
/// `G · C · Gᵀ` where `G[i, j] = ∂y_i/∂x_j`.
pub fn propagate_covariance(sensitivity: &Array2<f64>, covar: &Array2<f64>) -> Array2<f64> {
    sensitivity.dot(covar).dot(&sensitivity.t())
}

/// Calculate the correlation matrix from a covariance matrix.
///
/// Pairs involving a parameter with zero variance get a correlation of zero.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 {
            covar[[i, j]] / denom
        } else {
            0.0
        }
    })
}

/// Square roots of the diagonal. Negative or non-finite variances give NaN.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar
        .diag()
        .mapv(|v| if v >= 0.0 && v.is_finite() { v.sqrt() } else { f64::NAN })
}
