//! Options for a single fit call.

use crate::lm::IterationReport;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default number of evenly spaced points in a display curve.
pub const DEFAULT_SAMPLE_POINTS: usize = 300;

/// Shared flag for interrupting a running fit from another thread.
///
/// The objective checks it before every evaluation; a cancelled fit ends as
/// a failed fit.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to do with non-finite residuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NanPolicy {
    /// Count them as zero and warn
    #[default]
    Omit,
    /// Fail the evaluation
    Raise,
}

/// Per-call fit configuration.
pub struct FitOptions {
    /// Budget of objective evaluations; `None` uses
    /// `2000 * (number of global parameters + 1)`.
    pub max_evaluations: Option<usize>,
    /// Log every evaluation at debug level
    pub debug: bool,
    /// Grid size of the display curve
    pub sample_points: usize,
    pub nan_policy: NanPolicy,
    pub cancel: Option<CancellationToken>,
    /// Called after every objective evaluation the solver makes
    pub observer: Option<Box<dyn FnMut(&IterationReport)>>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: None,
            debug: false,
            sample_points: DEFAULT_SAMPLE_POINTS,
            nan_policy: NanPolicy::Omit,
            cancel: None,
            observer: None,
        }
    }
}

impl fmt::Debug for FitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitOptions")
            .field("max_evaluations", &self.max_evaluations)
            .field("debug", &self.debug)
            .field("sample_points", &self.sample_points)
            .field("nan_policy", &self.nan_policy)
            .field("cancel", &self.cancel)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from command tokens: the first all-digit token sets the
    /// evaluation budget and `-debug` turns on per-evaluation logging.
    /// Other tokens are ignored.
    pub fn from_tokens(tokens: &[&str]) -> Self {
        let max_evaluations = tokens
            .iter()
            .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
            .find_map(|t| t.parse().ok());
        let debug = tokens.iter().any(|t| t.eq_ignore_ascii_case("-debug"));

        Self {
            max_evaluations,
            debug,
            ..Self::default()
        }
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = Some(max_evaluations);
        self
    }

    pub fn with_sample_points(mut self, sample_points: usize) -> Self {
        self.sample_points = sample_points;
        self
    }

    pub fn with_nan_policy(mut self, nan_policy: NanPolicy) -> Self {
        self.nan_policy = nan_policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&IterationReport) + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The evaluation budget for a fit over `parameter_count` global
    /// parameters.
    pub fn evaluation_budget(&self, parameter_count: usize) -> usize {
        self.max_evaluations.unwrap_or(2000 * (parameter_count + 1))
    }
}
