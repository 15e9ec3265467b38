//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the core damped least-squares loop: forward-difference
//! Jacobian, Marquardt-scaled damping, and MINPACK-style termination tests
//! under a budget of residual evaluations.

use ndarray::{Array1, Array2};
use std::fmt;

use crate::error::{FitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference;

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::LmStep;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of residual evaluations, Jacobian columns included
    pub func_evals: usize,

    /// Whether one of the convergence tests was met
    pub success: bool,

    /// Why the iteration stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,

    /// The Jacobian at the solution, present when the fit converged
    pub jacobian: Option<Array2<f64>>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {}", self.params)?;
        Ok(())
    }
}

/// Progress reported after every residual evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// Accepted steps so far
    pub iteration: usize,
    /// Residual evaluations so far
    pub nfev: usize,
    /// Sum of squared residuals at the trial point
    pub sum_sq: f64,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the budget of residual evaluations.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.config.max_evaluations = max_evaluations;
        self
    }

    /// Set the tolerance for relative cost reduction.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for relative step length.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the orthogonality tolerance.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    pub fn minimize<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        self.minimize_observed(problem, initial_params, &mut |_: &IterationReport| {})
    }

    /// Minimize, calling `observer` after every residual evaluation,
    /// including those made for the Jacobian.
    ///
    /// Errors returned by the problem abort the minimization and are passed
    /// through. Running out of evaluations or damping is not an error; it
    /// yields a result with `success == false`.
    pub fn minimize_observed<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
        observer: &mut dyn FnMut(&IterationReport),
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(FitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let config = &self.config;
        let criteria = ConvergenceCriteria::new(config.xtol, config.ftol, config.gtol);

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut func_evals = 1;
        if residuals.len() != problem.residual_count() {
            return Err(FitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }

        let mut cost = sum_of_squares(&residuals);
        if !cost.is_finite() {
            return Err(FitError::Evaluation(
                "residuals are not finite at the starting point".to_string(),
            ));
        }
        observer(&IterationReport {
            iteration: 0,
            nfev: func_evals,
            sum_sq: cost,
        });

        let mut lambda = config.initial_lambda;
        let mut iterations = 0;
        let mut jacobian: Option<Array2<f64>> = None;

        let status = 'outer: loop {
            if func_evals + n_params > config.max_evaluations {
                break ConvergenceStatus::MaxEvaluationsReached;
            }
            let jac = finite_difference::jacobian_observed(
                problem,
                &params,
                &residuals,
                config.epsfcn,
                &mut |perturbed: &Array1<f64>| {
                    func_evals += 1;
                    observer(&IterationReport {
                        iteration: iterations,
                        nfev: func_evals,
                        sum_sq: sum_of_squares(perturbed),
                    });
                },
            )?;

            let jtj = jac.t().dot(&jac);
            let jtr = jac.t().dot(&residuals);
            let cosine = ConvergenceCriteria::gradient_cosine(&jac, &residuals);
            jacobian = Some(jac);

            let status = criteria.check_gradient(cost, cosine);
            if status.is_terminated() {
                break status;
            }

            // Raise the damping until a step lowers the cost.
            loop {
                if func_evals >= config.max_evaluations {
                    break 'outer ConvergenceStatus::MaxEvaluationsReached;
                }

                let step = match LmStep::calculate_step(&jtj, &jtr, lambda) {
                    Ok(result) => result.step,
                    Err(FitError::SingularMatrix) => {
                        lambda *= config.lambda_up_factor;
                        if lambda > config.max_lambda {
                            break 'outer ConvergenceStatus::DampingOverflow;
                        }
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let trial = &params + &step;
                let trial_residuals = problem.eval(&trial)?;
                func_evals += 1;
                let trial_cost = sum_of_squares(&trial_residuals);
                observer(&IterationReport {
                    iteration: iterations,
                    nfev: func_evals,
                    sum_sq: trial_cost,
                });

                if trial_cost.is_finite() && trial_cost < cost {
                    let status = criteria.check_step(&params, &step, cost, trial_cost);
                    params = trial;
                    residuals = trial_residuals;
                    cost = trial_cost;
                    jacobian = None;
                    lambda = (lambda * config.lambda_down_factor).max(config.min_lambda);
                    iterations += 1;
                    if status.is_terminated() {
                        break 'outer status;
                    }
                    break;
                }

                if criteria.step_is_negligible(&params, &step) {
                    break 'outer ConvergenceStatus::ParameterConvergence;
                }
                lambda *= config.lambda_up_factor;
                if lambda > config.max_lambda {
                    break 'outer ConvergenceStatus::DampingOverflow;
                }
            }
        };

        let success = status.is_converged();
        if success && jacobian.is_none() {
            jacobian = Some(finite_difference::jacobian_observed(
                problem,
                &params,
                &residuals,
                config.epsfcn,
                &mut |perturbed: &Array1<f64>| {
                    func_evals += 1;
                    observer(&IterationReport {
                        iteration: iterations,
                        nfev: func_evals,
                        sum_sq: sum_of_squares(perturbed),
                    });
                },
            )?);
        }

        log::debug!(
            "levenberg-marquardt stopped after {} iterations, {} evaluations: {}",
            iterations,
            func_evals,
            status.description()
        );

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success,
            status,
            message: status.description().to_string(),
            jacobian: if success { jacobian } else { None },
        })
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    let s: f64 = residuals.iter().map(|r| r * r).sum();
    if s.is_nan() {
        f64::INFINITY
    } else {
        s
    }
}
