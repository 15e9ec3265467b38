//! Problem definition trait.
//!
//! This module defines the `Problem` trait, the interface between the
//! Levenberg-Marquardt solver and whatever produces residuals.

use crate::error::Result;
use ndarray::Array1;

/// A trait representing a nonlinear least squares problem.
///
/// The solver minimizes the sum of squares of the vector returned by
/// [`eval`](Problem::eval).
pub trait Problem {
    /// Evaluate the residual vector at the given parameters.
    ///
    /// Returning an error aborts the minimization and the error is handed
    /// back to the solver's caller unchanged.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r * r).sum())
    }
}
