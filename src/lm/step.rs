//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! The step solves the Marquardt-damped normal equations
//! `(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr`.

use crate::error::{FitError, Result};
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};
use ndarray::{Array1, Array2};

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// Cost reduction predicted by the linearized model
    pub predicted_reduction: f64,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Solve for the damped step given `JᵀJ`, `Jᵀr` and the damping `lambda`.
    ///
    /// Columns with a zero diagonal are damped as if the diagonal were one so
    /// that parameters with no influence stay put instead of making the
    /// system singular.
    pub fn calculate_step(
        jtj: &Array2<f64>,
        jtr: &Array1<f64>,
        lambda: f64,
    ) -> Result<StepResult> {
        let mut damped = jtj.clone();
        for i in 0..damped.nrows() {
            let d = jtj[[i, i]];
            damped[[i, i]] += lambda * if d > 0.0 { d } else { 1.0 };
        }

        let rhs = -jtr;
        let step = Self::solve(&damped, &rhs)?;

        // For cost = Σr², the linear model predicts -(2 δᵀJᵀr + δᵀJᵀJδ).
        let predicted_reduction = -(2.0 * step.dot(jtr) + step.dot(&jtj.dot(&step)));

        Ok(StepResult {
            step,
            predicted_reduction,
        })
    }

    /// Solve `a x = b`, trying Cholesky first and falling back to LU.
    fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
        let a_na = ndarray_to_nalgebra(a);
        let b_na = ndarray_vec_to_nalgebra(b);

        let solution = match a_na.clone().cholesky() {
            Some(chol) => Some(chol.solve(&b_na)),
            None => a_na.lu().solve(&b_na),
        };

        match solution {
            Some(x) if x.iter().all(|v| v.is_finite()) => Ok(nalgebra_vec_to_ndarray(&x)),
            _ => Err(FitError::SingularMatrix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_undamped_step_is_gauss_newton() {
        // r = [x - 1, y - 2] at (0, 0): J = I, Jᵀr = [-1, -2]
        let jtj = array![[1.0, 0.0], [0.0, 1.0]];
        let jtr = array![-1.0, -2.0];
        let result = LmStep::calculate_step(&jtj, &jtr, 0.0).unwrap();
        assert_relative_eq!(result.step[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.step[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.predicted_reduction, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_damping_shortens_step() {
        let jtj = array![[4.0, 1.0], [1.0, 3.0]];
        let jtr = array![-1.0, -2.0];
        let small = LmStep::calculate_step(&jtj, &jtr, 1e-3).unwrap();
        let large = LmStep::calculate_step(&jtj, &jtr, 1e3).unwrap();
        assert!(large.step.dot(&large.step) < small.step.dot(&small.step));
    }

    #[test]
    fn test_zero_column_does_not_move() {
        let jtj = array![[2.0, 0.0], [0.0, 0.0]];
        let jtr = array![-2.0, 0.0];
        let result = LmStep::calculate_step(&jtj, &jtr, 1e-3).unwrap();
        assert_eq!(result.step[1], 0.0);
    }
}
