//! # globfit
//!
//! Global nonlinear least-squares fitting of experimental traces.
//!
//! Each dataset selects one or more models from a catalog; their sum is fitted
//! to every dataset of a range at once. Parameters may be fixed, bounded, or
//! linked across datasets through expressions such as `Rmax_5_1` or
//! `2 * kd_2_1`, so the solver sees one global problem.
//!
//! The library provides:
//! - A model catalog ([`ModelRegistry`]) of formula and script models
//! - Model composition with parameter renumbering ([`ComposedModel`])
//! - A Levenberg-Marquardt solver working in bound-transformed coordinates
//! - Post-fit residuals, R², chi-square, standard errors, and display curves
//!
//! ## Basic Usage
//!
//! ```
//! use globfit::{apply_models, fit, DataMatrix, Dataset, FitOptions, FittingContext, ModelRegistry};
//! use ndarray::Array1;
//!
//! let registry = ModelRegistry::builtin();
//! let mut matrix = DataMatrix::new();
//! let x = Array1::linspace(0.0, 10.0, 21);
//! let y = x.mapv(|x| 0.5 * x + 2.0);
//! matrix.push(Dataset::new(x, y));
//!
//! let ctx = FittingContext::all();
//! apply_models(&mut matrix, registry, &ctx, &[27]).unwrap();
//! let report = fit(&mut matrix, registry, &ctx, FitOptions::default()).unwrap();
//!
//! let slope = report.parameter("Slope_1_1").unwrap().value;
//! assert!((slope - 0.5).abs() < 1e-4);
//! ```

pub mod command;
pub mod dataset;
pub mod error;
pub mod fit;
pub mod lm;
pub mod model;
pub mod models;
pub mod parameters;
pub mod problem;
pub mod uncertainty;
pub mod utils;

// Re-exports for convenience
pub use dataset::{DataMatrix, Dataset, DatasetRange, FitSpec, FittingContext, Trace};
pub use error::{FitError, Result};
pub use fit::{fit, regenerate, FitOptions, FitReport};
pub use lm::LevenbergMarquardt;
pub use model::{apply_models, ComposedModel, Coordinates};
pub use models::{ModelDefinition, ModelRegistry};
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
