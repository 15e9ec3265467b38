//! Convergence criteria for the Levenberg-Marquardt solver.
//!
//! The tests follow MINPACK's `lmdif` conventions: relative cost reduction
//! (`ftol`), relative step length (`xtol`) and the orthogonality between the
//! residual vector and the Jacobian columns (`gtol`).

use ndarray::{Array1, Array2};

/// Possible states of a minimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The residuals vanished.
    ExactFit,

    /// Converged because the step became small.
    ParameterConvergence,

    /// Converged because the cost stopped decreasing.
    FunctionValueConvergence,

    /// Converged because the residuals are orthogonal to the Jacobian.
    GradientConvergence,

    /// Stopped after spending the evaluation budget.
    MaxEvaluationsReached,

    /// Stopped because the damping grew without finding a better point.
    DampingOverflow,
}

impl ConvergenceStatus {
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ExactFit
                | ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ExactFit => "Converged: residuals are zero",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small cost change",
            ConvergenceStatus::GradientConvergence => "Converged: residuals orthogonal to Jacobian",
            ConvergenceStatus::MaxEvaluationsReached => {
                "Terminated: maximum number of function evaluations exceeded"
            }
            ConvergenceStatus::DampingOverflow => {
                "Terminated: damping reached its maximum without reducing the cost"
            }
        }
    }
}

/// Tolerances for the convergence tests.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceCriteria {
    pub xtol: f64,
    pub ftol: f64,
    pub gtol: f64,
}

impl ConvergenceCriteria {
    pub fn new(xtol: f64, ftol: f64, gtol: f64) -> Self {
        Self { xtol, ftol, gtol }
    }

    /// Largest `|J_jᵀ r| / (‖J_j‖ ‖r‖)` over the columns of `jacobian`.
    pub fn gradient_cosine(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> f64 {
        let r_norm = residuals.dot(residuals).sqrt();
        if r_norm == 0.0 {
            return 0.0;
        }
        jacobian
            .columns()
            .into_iter()
            .map(|col| {
                let c_norm = col.dot(&col).sqrt();
                if c_norm == 0.0 {
                    0.0
                } else {
                    (col.dot(residuals) / (c_norm * r_norm)).abs()
                }
            })
            .fold(0.0, f64::max)
    }

    /// Check the state after computing the gradient at the current point.
    pub fn check_gradient(&self, cost: f64, cosine: f64) -> ConvergenceStatus {
        if cost == 0.0 {
            ConvergenceStatus::ExactFit
        } else if cosine <= self.gtol {
            ConvergenceStatus::GradientConvergence
        } else {
            ConvergenceStatus::Running
        }
    }

    /// `‖step‖ ≤ xtol (‖params‖ + xtol)`
    pub fn step_is_negligible(&self, params: &Array1<f64>, step: &Array1<f64>) -> bool {
        let x_norm = params.dot(params).sqrt();
        let step_norm = step.dot(step).sqrt();
        step_norm <= self.xtol * (x_norm + self.xtol)
    }

    /// Check the state after a step from `params` by `step` that moved the
    /// cost from `cost` to `new_cost`.
    pub fn check_step(
        &self,
        params: &Array1<f64>,
        step: &Array1<f64>,
        cost: f64,
        new_cost: f64,
    ) -> ConvergenceStatus {
        if new_cost == 0.0 {
            return ConvergenceStatus::ExactFit;
        }

        if self.step_is_negligible(params, step) {
            return ConvergenceStatus::ParameterConvergence;
        }

        if new_cost <= cost && cost - new_cost <= self.ftol * cost {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        ConvergenceStatus::Running
    }
}
