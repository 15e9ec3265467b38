//! Levenberg-Marquardt algorithm implementation.
//!
//! The solver collaborator of the fitting engine: it minimizes the sum of
//! squares of a [`Problem`](crate::problem::Problem)'s residual vector under a
//! budget of residual evaluations, and hands back the Jacobian at the solution
//! for error estimation.

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod step;

pub use algorithm::{IterationReport, LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, StepResult};
