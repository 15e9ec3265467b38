//! Conversions between `ndarray` containers and `nalgebra` matrices.
//!
//! Residuals and Jacobians travel as `ndarray` arrays; the dense solves in the
//! solver and the covariance inversion run on `nalgebra`.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

pub fn ndarray_to_nalgebra(arr: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

pub fn nalgebra_to_ndarray(mat: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

pub fn ndarray_vec_to_nalgebra(arr: &Array1<f64>) -> DVector<f64> {
    DVector::from_iterator(arr.len(), arr.iter().copied())
}

pub fn nalgebra_vec_to_ndarray(vec: &DVector<f64>) -> Array1<f64> {
    vec.iter().copied().collect()
}
