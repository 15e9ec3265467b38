//! The global parameter table of one fit call.

use crate::dataset::DataMatrix;
use crate::error::{FitError, Result};
use crate::model::ComposedModel;
use crate::models::ModelRegistry;
use crate::parameters::{Parameter, Parameters};
use std::ops::RangeInclusive;

/// Global name of parameter `slot` of dataset `dataset`, both 0-based.
///
/// The name carries 1-based numbers, the numbering link expressions use.
pub fn parameter_name(identifier: &str, slot: usize, dataset: usize) -> String {
    format!("{}_{}_{}", identifier, slot + 1, dataset + 1)
}

/// One dataset's share of the session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    /// Dataset index in the matrix
    pub index: usize,
    pub model: ComposedModel,
    /// Positions of this dataset's parameters in the session table
    pub param_indices: Vec<usize>,
}

/// Parameters of every dataset in a range, as one named table.
#[derive(Debug, Clone)]
pub struct OptimizationSession {
    params: Parameters,
    entries: Vec<SessionEntry>,
    points_per_dataset: usize,
}

impl OptimizationSession {
    /// Build the table for `range`, checking everything that can be checked
    /// before the solver runs.
    pub fn build(
        matrix: &DataMatrix,
        registry: &ModelRegistry,
        range: RangeInclusive<usize>,
    ) -> Result<Self> {
        let mut params = Parameters::new();
        let mut entries = Vec::new();

        for i in range.clone() {
            let dataset = matrix.get(i).ok_or(FitError::DatasetOutOfRange {
                first: *range.start(),
                last: *range.end(),
                count: matrix.len(),
            })?;
            let spec = &dataset.fit;
            if spec.parameters.is_empty() {
                return Err(FitError::UninitializedParameters { dataset: i });
            }

            let model = ComposedModel::compose(registry, &spec.model_ids)?;
            let n = model.parameter_count();
            if spec.parameters.len() != n || spec.free.len() != n || spec.links.len() != n {
                return Err(FitError::InvalidParameters(format!(
                    "dataset {} stores {} values, {} flags and {} links for a {}-parameter model",
                    i,
                    spec.parameters.len(),
                    spec.free.len(),
                    spec.links.len(),
                    n
                )));
            }

            let mut param_indices = Vec::with_capacity(n);
            for (j, slot) in model.slots().iter().enumerate() {
                let name = parameter_name(&slot.identifier, j, i);
                let mut param = Parameter::with_bounds(&name, spec.parameters[j], slot.bounds);
                param.vary = spec.free[j];
                param.set_expr(spec.links[j].as_deref());
                param_indices.push(params.len());
                params.add(param)?;
            }

            entries.push(SessionEntry {
                index: i,
                model,
                param_indices,
            });
        }

        params.resolve_links()?;
        params.update_expressions()?;

        let expected = entries
            .first()
            .and_then(|e| matrix.get(e.index))
            .map_or(0, |d| d.len());
        for entry in &entries {
            let Some(dataset) = matrix.get(entry.index) else { continue };
            if dataset.len() != expected {
                return Err(FitError::ShapeMismatch {
                    dataset: entry.index,
                    expected,
                    found: dataset.len(),
                });
            }
            if dataset.data.y.len() != dataset.len() {
                return Err(FitError::DimensionMismatch(format!(
                    "dataset {} has {} x values and {} y values",
                    entry.index,
                    dataset.len(),
                    dataset.data.y.len()
                )));
            }
            if dataset.weights.len() > 1 && dataset.weights.len() != dataset.len() {
                return Err(FitError::DimensionMismatch(format!(
                    "dataset {} has {} weights for {} points",
                    entry.index,
                    dataset.weights.len(),
                    dataset.len()
                )));
            }
        }

        if params.varying_count() == 0 {
            return Err(FitError::InvalidParameters(
                "no parameter is free to vary".to_string(),
            ));
        }

        Ok(Self {
            params,
            entries,
            points_per_dataset: expected,
        })
    }

    /// The table, with link values refreshed from the initial values.
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    pub fn varying_count(&self) -> usize {
        self.params.varying_count()
    }

    /// Length of the residual vector handed to the solver.
    pub fn residual_count(&self) -> usize {
        self.points_per_dataset * self.entries.len()
    }
}
