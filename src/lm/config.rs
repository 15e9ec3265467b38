//! Configuration options for the Levenberg-Marquardt solver.

use crate::utils::finite_difference::DEFAULT_EPSFCN;

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone)]
pub struct LmConfig {
    /// Budget of residual evaluations, Jacobian columns included. Default: 2000
    pub max_evaluations: usize,

    /// Relative reduction of the cost below which the fit has converged. Default: 1.5e-8
    pub ftol: f64,

    /// Relative step length below which the fit has converged. Default: 1.5e-8
    pub xtol: f64,

    /// Largest cosine between residuals and Jacobian columns treated as
    /// orthogonal. Default: 0.0
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda; reaching it stops the fit. Default: 1e12
    pub max_lambda: f64,

    /// Relative forward-difference step for the Jacobian. Default: sqrt(f64::EPSILON)
    pub epsfcn: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 2000,
            ftol: 1.5e-8,
            xtol: 1.5e-8,
            gtol: 0.0,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            epsfcn: DEFAULT_EPSFCN,
        }
    }
}
