//! Numerical helpers shared by the solver and the model catalog.

pub mod finite_difference;
pub mod matrix_convert;
pub mod serde_nan;
pub mod special;

pub use matrix_convert::{
    nalgebra_to_ndarray, nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};
pub use special::lambert_w;
