//! # Uncertainty Calculation
//!
//! Goodness-of-fit diagnostics and parameter standard errors, computed the
//! way lmfit reports them:
//!
//! - `chisqr = Σ r²`, `nfree = ndata - nvarys`, `redchi = chisqr / nfree`
//! - `aic = n ln(chisqr/n) + 2 nvarys`, `bic = n ln(chisqr/n) + ln(n) nvarys`
//! - covariance `redchi · inv(JᵀJ)` in the solver's coordinates, carried to
//!   every external parameter value by first-order propagation

mod covariance;

pub use covariance::{
    calculate_correlation, calculate_covariance, propagate_covariance,
    standard_errors_from_covariance,
};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Aggregate diagnostics of one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFit {
    /// Length of the residual vector
    pub ndata: usize,
    /// Number of varying parameters
    pub nvarys: usize,
    /// `ndata - nvarys`, zero when there are more variables than data
    pub nfree: usize,
    pub chisqr: f64,
    /// NaN when `nfree == 0`
    #[serde(with = "crate::utils::serde_nan")]
    pub redchi: f64,
    #[serde(with = "crate::utils::serde_nan")]
    pub aic: f64,
    #[serde(with = "crate::utils::serde_nan")]
    pub bic: f64,
}

impl GoodnessOfFit {
    pub fn new(ndata: usize, nvarys: usize, chisqr: f64) -> Self {
        let nfree = ndata.saturating_sub(nvarys);
        let redchi = if nfree > 0 {
            chisqr / nfree as f64
        } else {
            f64::NAN
        };

        let n = ndata as f64;
        let (aic, bic) = if ndata > 0 {
            let floored = chisqr.max(1e-250 * n);
            let neg2_log_likel = n * (floored / n).ln();
            (
                neg2_log_likel + 2.0 * nvarys as f64,
                neg2_log_likel + n.ln() * nvarys as f64,
            )
        } else {
            (f64::NAN, f64::NAN)
        };

        Self {
            ndata,
            nvarys,
            nfree,
            chisqr,
            redchi,
            aic,
            bic,
        }
    }
}

/// Standard errors of every external parameter.
///
/// `jacobian` is taken with respect to the solver's internal coordinates and
/// `sensitivity[i, j]` is `∂(external value i)/∂(internal coordinate j)`.
/// Parameters whose error cannot be estimated come back as NaN.
pub fn parameter_standard_errors(
    jacobian: &Array2<f64>,
    redchi: f64,
    sensitivity: &Array2<f64>,
) -> Result<Array1<f64>> {
    let internal = calculate_covariance(jacobian, redchi)?;
    let external = propagate_covariance(sensitivity, &internal);
    Ok(standard_errors_from_covariance(&external))
}
