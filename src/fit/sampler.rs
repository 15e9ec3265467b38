//! Display-curve sampling.
//!
//! A display curve covers `[min(x), max(x)]` with an even grid and keeps the
//! original data coordinates, except where a data point sits alone between
//! two grid points. For log-spaced data this keeps the dense low end without
//! doubling every grid cell further up.

use crate::dataset::{Dataset, Trace};
use crate::error::Result;
use crate::model::ComposedModel;
use ndarray::Array1;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Origin {
    Grid,
    Data,
}

/// Ascending sample coordinates for data coordinates `x`.
///
/// Non-finite coordinates are skipped. The result never holds the same
/// coordinate twice.
pub fn sample_coordinates(x: &[f64], points: usize) -> Vec<f64> {
    let finite: Vec<f64> = x.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut merged: Vec<(f64, Origin)> = grid(min, max, points)
        .into_iter()
        .map(|v| (v, Origin::Grid))
        .chain(finite.into_iter().map(|v| (v, Origin::Data)))
        .collect();
    // stable: grid points come first among equal coordinates
    merged.sort_by(|a, b| a.0.total_cmp(&b.0));

    for j in (1..merged.len().saturating_sub(1)).rev() {
        if merged[j].1 == Origin::Data
            && merged[j - 1].1 == Origin::Grid
            && merged[j + 1].1 == Origin::Grid
        {
            merged.remove(j);
        }
    }

    let mut coords: Vec<f64> = merged.into_iter().map(|(v, _)| v).collect();
    coords.dedup();
    coords
}

// `points` evenly spaced values from `min`, excluding `max`. When the span
// overflows, each step is taken as two half-steps.
fn grid(min: f64, max: f64, points: usize) -> Vec<f64> {
    let span = max - min;
    if span.is_finite() {
        let step = span / points as f64;
        return (0..points).map(|k| min + step * k as f64).collect();
    }
    let half = (max / 2.0 - min / 2.0) / points as f64;
    (0..points)
        .map(|k| {
            let offset = half * k as f64;
            (min + offset + offset).min(max)
        })
        .collect()
}

/// Evaluate `model` over the sample coordinates of `dataset`.
pub fn generate_model(
    dataset: &Dataset,
    model: &ComposedModel,
    params: &[f64],
    points: usize,
) -> Result<Trace> {
    let xs = Array1::from(sample_coordinates(&dataset.data.x.to_vec(), points));
    let coords = dataset.coordinates().with_x(xs.view());
    let ys = model.evaluate(params, &coords)?;
    Ok(Trace::new(xs, ys))
}
