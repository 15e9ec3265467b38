//! Per-dataset goodness-of-fit figures.

use ndarray::{Array1, ArrayView1};

/// Floor for the mean absolute residual used as the chi-square scale.
const SD_FLOOR: f64 = 0.001;

/// R² and the scaled chi-square of one dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitStatistics {
    /// `1 - SSR/SST`; NaN when the observations are constant
    pub rsq: f64,
    /// `Σ r² / SD` with `SD` the mean absolute residual
    pub chisq: f64,
}

impl FitStatistics {
    pub fn compute(observed: ArrayView1<'_, f64>, residuals: &Array1<f64>) -> Self {
        let n = residuals.len();
        if n == 0 {
            return Self {
                rsq: f64::NAN,
                chisq: f64::NAN,
            };
        }

        let ssr: f64 = residuals.iter().map(|r| r * r).sum();
        let rsq = match observed.mean() {
            Some(mean) => {
                let sst: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
                if sst > 0.0 {
                    1.0 - ssr / sst
                } else {
                    f64::NAN
                }
            }
            None => f64::NAN,
        };

        let mut sd = residuals.iter().map(|r| r.abs()).sum::<f64>() / n as f64;
        if sd == 0.0 {
            sd = SD_FLOOR;
        }

        Self {
            rsq,
            chisq: ssr / sd,
        }
    }
}
