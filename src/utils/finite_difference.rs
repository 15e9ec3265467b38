//! Forward-difference Jacobian for the solver.

use crate::error::{FitError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default relative step, `sqrt(machine epsilon)`.
pub const DEFAULT_EPSFCN: f64 = 1.490_116_119_384_765_6e-8;

/// Compute the Jacobian `J[i, j] = ∂r_i/∂p_j` by forward differences.
///
/// `residuals` must be the residual vector already evaluated at `params`;
/// passing it in saves one evaluation per call. The step for parameter `j` is
/// `epsfcn * |p_j|`, or `epsfcn` when `p_j` is zero.
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsfcn: f64,
) -> Result<Array2<f64>> {
    jacobian_observed(problem, params, residuals, epsfcn, &mut |_: &Array1<f64>| {})
}

/// [`jacobian`], handing each perturbed residual vector to `observe` as it
/// is evaluated.
pub fn jacobian_observed<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsfcn: f64,
    observe: &mut dyn FnMut(&Array1<f64>),
) -> Result<Array2<f64>> {
    let n_params = params.len();
    let n_residuals = residuals.len();
    let mut jac = Array2::zeros((n_residuals, n_params));
    let mut shifted = params.clone();

    for j in 0..n_params {
        let step = if params[j] != 0.0 {
            epsfcn * params[j].abs()
        } else {
            epsfcn
        };
        shifted[j] = params[j] + step;
        let perturbed = problem.eval(&shifted)?;
        shifted[j] = params[j];
        observe(&perturbed);

        if perturbed.len() != n_residuals {
            return Err(FitError::DimensionMismatch(format!(
                "expected {} residuals, got {}",
                n_residuals,
                perturbed.len()
            )));
        }

        let mut column = jac.column_mut(j);
        for i in 0..n_residuals {
            column[i] = (perturbed[i] - residuals[i]) / step;
        }
    }

    Ok(jac)
}
