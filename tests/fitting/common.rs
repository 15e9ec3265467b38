use globfit::{DataMatrix, Dataset};
use ndarray::Array1;

/// Datasets sampled from `f(x, k)` for `k` in `0..sets` on a shared grid.
pub fn synthetic<F>(sets: usize, points: usize, x_max: f64, f: F) -> DataMatrix
where
    F: Fn(f64, usize) -> f64,
{
    let mut matrix = DataMatrix::new();
    for k in 0..sets {
        let x = Array1::linspace(0.0, x_max, points);
        let y = x.mapv(|x| f(x, k));
        matrix.push(Dataset::new(x, y));
    }
    matrix
}
