//! Datasets, their persistent fit state, and the range a fit works on.

use crate::error::{FitError, Result};
use crate::model::{ComposedModel, Coordinates};
use crate::parameters::Bounds;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Three parallel coordinate arrays. Unused channels are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub z: Array1<f64>,
}

impl Trace {
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Self {
        Self {
            x,
            y,
            z: Array1::zeros(0),
        }
    }
}

/// The model selection and fit results kept with a dataset between fits.
///
/// All per-parameter vectors share the length of `parameters`. Equality
/// treats two NaN values as equal, so an unfitted spec equals its clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSpec {
    /// Selected catalog ids; their order fixes the parameter numbering
    pub model_ids: Vec<u32>,
    pub parameters: Vec<f64>,
    pub bounds: Vec<Bounds>,
    /// `true` if the solver may move the parameter
    pub free: Vec<bool>,
    /// Link expression per parameter, in terms of global parameter names
    pub links: Vec<Option<String>>,
    pub formula: String,
    pub fit_failed: bool,
    pub failure_reason: Option<String>,
    #[serde(with = "crate::utils::serde_nan::vec")]
    pub errors: Vec<f64>,
    #[serde(with = "crate::utils::serde_nan")]
    pub rsq: f64,
    #[serde(with = "crate::utils::serde_nan")]
    pub chisq: f64,
}

impl Default for FitSpec {
    fn default() -> Self {
        Self {
            model_ids: Vec::new(),
            parameters: Vec::new(),
            bounds: Vec::new(),
            free: Vec::new(),
            links: Vec::new(),
            formula: String::new(),
            fit_failed: false,
            failure_reason: None,
            errors: Vec::new(),
            rsq: f64::NAN,
            chisq: f64::NAN,
        }
    }
}

impl PartialEq for FitSpec {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            a == b || (a.is_nan() && b.is_nan())
        }
        fn same_all(a: &[f64], b: &[f64]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| same(x, y))
        }

        self.model_ids == other.model_ids
            && same_all(&self.parameters, &other.parameters)
            && self.bounds == other.bounds
            && self.free == other.free
            && self.links == other.links
            && self.formula == other.formula
            && self.fit_failed == other.fit_failed
            && self.failure_reason == other.failure_reason
            && same_all(&self.errors, &other.errors)
            && same(self.rsq, other.rsq)
            && same(self.chisq, other.chisq)
    }
}

impl FitSpec {
    /// Start over from a freshly composed model: defaults, declared bounds,
    /// every parameter free and unlinked.
    pub fn reset_to(&mut self, model: &ComposedModel) {
        let n = model.parameter_count();
        *self = Self {
            model_ids: model.ids().to_vec(),
            parameters: model.defaults(),
            bounds: model.bounds(),
            free: vec![true; n],
            links: vec![None; n],
            formula: model.formula().to_string(),
            errors: vec![0.0; n],
            ..Self::default()
        };
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Record a failed fit: parameters and errors become `count` entries of
    /// `-1`, where `count` is the size of the whole fit's parameter table.
    /// The spec has to be re-applied before it can be fitted again.
    pub fn mark_failed(&mut self, reason: &str, count: usize) {
        self.fit_failed = true;
        self.failure_reason = Some(reason.to_string());
        self.parameters = vec![-1.0; count];
        self.errors = vec![-1.0; count];
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One experimental trace with its model selection and fit state.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub data: Trace,
    /// Per-point weights; applied only when longer than one element
    pub weights: Array1<f64>,
    pub instrument_response: Trace,
    /// Observed minus model at every data point, from the latest evaluation
    pub residuals: Trace,
    /// Smooth display curve from the latest fit or regeneration
    pub model: Trace,
    pub fit: FitSpec,
}

impl Dataset {
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Self {
        Self {
            data: Trace::new(x, y),
            ..Self::default()
        }
    }

    pub fn with_z(mut self, z: Array1<f64>) -> Self {
        self.data.z = z;
        self
    }

    pub fn with_weights(mut self, weights: Array1<f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_instrument_response(mut self, response: Trace) -> Self {
        self.instrument_response = response;
        self
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.data.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.x.is_empty()
    }

    /// Views of every channel a model may read.
    pub fn coordinates(&self) -> Coordinates<'_> {
        Coordinates {
            x: self.data.x.view(),
            y: self.data.y.view(),
            z: self.data.z.view(),
            ir_x: self.instrument_response.x.view(),
            ir_y: self.instrument_response.y.view(),
            ir_z: self.instrument_response.z.view(),
        }
    }
}

/// The ordered collection of loaded datasets.
#[derive(Debug, Clone, Default)]
pub struct DataMatrix {
    datasets: Vec<Dataset>,
}

impl DataMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dataset and return its index.
    pub fn push(&mut self, dataset: Dataset) -> usize {
        self.datasets.push(dataset);
        self.datasets.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Dataset> {
        self.datasets.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Dataset> {
        self.datasets.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Dataset> {
        self.datasets.iter_mut()
    }

    /// Dataset indices covered by `range`.
    pub fn indices(&self, range: DatasetRange) -> Result<RangeInclusive<usize>> {
        let count = self.datasets.len();
        let (first, last) = match range {
            DatasetRange::All if count == 0 => return Err(FitError::EmptyRange),
            DatasetRange::All => (0, count - 1),
            DatasetRange::Span { first, last } => (first, last),
        };
        if first > last {
            return Err(FitError::EmptyRange);
        }
        if last >= count {
            return Err(FitError::DatasetOutOfRange { first, last, count });
        }
        Ok(first..=last)
    }
}

/// Which datasets an operation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatasetRange {
    #[default]
    All,
    /// Inclusive, 0-based
    Span { first: usize, last: usize },
}

/// State threaded through composition, fitting and regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FittingContext {
    pub range: DatasetRange,
}

impl FittingContext {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn span(first: usize, last: usize) -> Self {
        Self {
            range: DatasetRange::Span { first, last },
        }
    }
}
