//! # Parameter System
//!
//! Named parameters with bounds, free/fixed flags and link expressions, plus
//! the small expression language shared by model formulas and links.
//!
//! - [`Parameter`]: one value with bounds, a `vary` flag and an optional link
//! - [`Parameters`]: an ordered table that resolves links in dependency order
//! - [`Bounds`] and [`BoundsTransform`]: the bound-removing variable change
//!   the solver works in
//! - [`Expression`]: parse/evaluate `P[0]*exp(-X/P[1])` or `Rmax_1_1 * 2`
//!
//! ```rust
//! use globfit::parameters::{Parameter, Parameters};
//!
//! let mut params = Parameters::new();
//! params.add(Parameter::new("Add_Constant_1_1", 2.0)).unwrap();
//!
//! let mut shared = Parameter::new("Add_Constant_1_2", 0.0);
//! shared.set_expr(Some("Add_Constant_1_1"));
//! params.add(shared).unwrap();
//!
//! params.update_expressions().unwrap();
//! assert_eq!(params.get("Add_Constant_1_2").unwrap().value(), 2.0);
//! assert_eq!(params.varying_count(), 1);
//! ```

pub mod bounds;
pub mod expression;
pub mod parameter;
pub mod parameters;

pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use expression::{EvaluationContext, ExprResult, Expression, ExpressionError, SimpleContext};
pub use parameter::{Parameter, ParameterError};
pub use parameters::Parameters;
