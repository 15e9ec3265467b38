//! The residual function the solver minimizes.

use crate::dataset::{DataMatrix, Dataset};
use crate::error::{FitError, Result};
use crate::fit::options::{CancellationToken, NanPolicy};
use crate::fit::session::OptimizationSession;
use crate::fit::statistics::FitStatistics;
use crate::model::ComposedModel;
use crate::parameters::Parameters;
use crate::problem::Problem;
use ndarray::{s, Array1};
use std::cell::RefCell;

/// Residuals of one dataset.
#[derive(Debug, Clone)]
pub struct DatasetResiduals {
    /// `observed - model`, unweighted
    pub residuals: Array1<f64>,
    /// Weighted residuals squared, as handed to the solver
    pub squared: Array1<f64>,
    pub statistics: FitStatistics,
    /// Non-finite squared residuals replaced by zero
    pub omitted: usize,
}

/// Evaluate `model` on `dataset` and form its residuals.
pub fn dataset_residuals(
    dataset: &Dataset,
    model: &ComposedModel,
    params: &[f64],
    nan_policy: NanPolicy,
) -> Result<DatasetResiduals> {
    let predicted = model.evaluate(params, &dataset.coordinates())?;
    let residuals = &dataset.data.y - &predicted;

    let weighted = if dataset.weights.len() > 1 {
        &residuals * &dataset.weights
    } else {
        residuals.clone()
    };

    let mut omitted = 0;
    let mut squared = weighted.mapv(|r| r * r);
    for value in squared.iter_mut().filter(|v| !v.is_finite()) {
        match nan_policy {
            NanPolicy::Omit => {
                *value = 0.0;
                omitted += 1;
            }
            NanPolicy::Raise => {
                return Err(FitError::Evaluation(
                    "model produced non-finite residuals".to_string(),
                ))
            }
        }
    }

    let statistics = FitStatistics::compute(dataset.data.y.view(), &residuals);
    Ok(DatasetResiduals {
        residuals,
        squared,
        statistics,
        omitted,
    })
}

// Mutable state of the objective; the solver only holds `&self`.
#[derive(Debug)]
struct ObjectiveState {
    params: Parameters,
    last: Vec<DatasetResiduals>,
}

/// Squared residuals of every dataset in a session, concatenated in
/// dataset order.
///
/// Each evaluation also records the per-dataset residuals and statistics,
/// available through [`latest`](Self::latest) once the solver returns.
#[derive(Debug)]
pub struct GlobalObjective<'a> {
    session: &'a OptimizationSession,
    matrix: &'a DataMatrix,
    nan_policy: NanPolicy,
    cancel: Option<CancellationToken>,
    state: RefCell<ObjectiveState>,
}

impl<'a> GlobalObjective<'a> {
    pub fn new(
        session: &'a OptimizationSession,
        matrix: &'a DataMatrix,
        nan_policy: NanPolicy,
        cancel: Option<CancellationToken>,
    ) -> Self {
        Self {
            session,
            matrix,
            nan_policy,
            cancel,
            state: RefCell::new(ObjectiveState {
                params: session.parameters().clone(),
                last: Vec::new(),
            }),
        }
    }

    /// Parameters and per-dataset residuals of the latest evaluation.
    pub fn latest(&self) -> (Parameters, Vec<DatasetResiduals>) {
        let state = self.state.borrow();
        (state.params.clone(), state.last.clone())
    }
}

impl Problem for GlobalObjective<'_> {
    fn eval(&self, internal: &Array1<f64>) -> Result<Array1<f64>> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(FitError::Cancelled);
        }

        let mut state = self.state.borrow_mut();
        state.params.update_from_internal(&internal.to_vec())?;
        let values = state.params.values();

        let mut out = Array1::zeros(self.session.residual_count());
        let mut last = Vec::with_capacity(self.session.entries().len());
        let mut offset = 0;
        for entry in self.session.entries() {
            let dataset = self.matrix.get(entry.index).ok_or_else(|| {
                FitError::DimensionMismatch(format!("dataset {} disappeared", entry.index))
            })?;
            let local: Vec<f64> = entry.param_indices.iter().map(|&k| values[k]).collect();
            let part = dataset_residuals(dataset, &entry.model, &local, self.nan_policy)?;

            let end = offset + part.squared.len();
            if end > out.len() {
                return Err(FitError::DimensionMismatch(format!(
                    "dataset {} produced {} residuals",
                    entry.index,
                    part.squared.len()
                )));
            }
            out.slice_mut(s![offset..end]).assign(&part.squared);
            offset = end;
            last.push(part);
        }

        state.last = last;
        Ok(out)
    }

    fn parameter_count(&self) -> usize {
        self.session.varying_count()
    }

    fn residual_count(&self) -> usize {
        self.session.residual_count()
    }
}
