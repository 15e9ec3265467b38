//! # Global Fitting
//!
//! Fits the composed models of a range of datasets simultaneously. Every
//! dataset contributes its own copy of its model's parameters to one named
//! table; link expressions tie entries of that table together, so a rate
//! constant can be shared across a titration series while amplitudes stay
//! per-trace.
//!
//! ```rust
//! use globfit::{apply_models, fit, DataMatrix, Dataset, FitOptions, FittingContext, ModelRegistry};
//! use ndarray::Array1;
//!
//! let registry = ModelRegistry::builtin();
//! let mut matrix = DataMatrix::new();
//! for level in [3.0, 3.0] {
//!     let x = Array1::linspace(0.0, 1.0, 8);
//!     matrix.push(Dataset::new(x, Array1::from_elem(8, level)));
//! }
//! let ctx = FittingContext::all();
//! apply_models(&mut matrix, registry, &ctx, &[1]).unwrap();
//! matrix.get_mut(1).unwrap().fit.links[0] = Some("Add_Constant_1_1".to_string());
//!
//! let report = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap();
//! assert_eq!(report.nvarys(), 1);
//! ```

mod adapter;
mod objective;
mod options;
mod report;
mod sampler;
mod session;
mod statistics;

pub use adapter::{fit, regenerate};
pub use objective::{dataset_residuals, DatasetResiduals, GlobalObjective};
pub use options::{CancellationToken, FitOptions, NanPolicy, DEFAULT_SAMPLE_POINTS};
pub use report::{FitReport, ReportedParameter};
pub use sampler::{generate_model, sample_coordinates};
pub use session::{parameter_name, OptimizationSession, SessionEntry};
pub use statistics::FitStatistics;
