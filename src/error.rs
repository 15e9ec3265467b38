use crate::models::RegistryError;
use crate::parameters::{BoundsError, ExpressionError, ParameterError};
use thiserror::Error;

/// Error types for the globfit library.
#[derive(Error, Debug)]
pub enum FitError {
    /// A dataset in the fit range has no model parameters.
    #[error("Dataset {dataset} has no parameters; select models for it first")]
    UninitializedParameters { dataset: usize },

    /// A link expression references an unknown name, loops, or cannot be evaluated.
    #[error("Invalid link for parameter '{parameter}': {message}")]
    LinkingScheme { parameter: String, message: String },

    /// Datasets in the fit range differ in point count.
    #[error("Dataset {dataset} has {found} points, expected {expected}")]
    ShapeMismatch {
        dataset: usize,
        expected: usize,
        found: usize,
    },

    /// Parameter values, flags or bounds are unusable.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The selected dataset range contains no datasets.
    #[error("Dataset range is empty")]
    EmptyRange,

    /// The selected dataset range does not fit the loaded datasets.
    #[error("Dataset range {first}..={last} is outside the {count} loaded datasets")]
    DatasetOutOfRange {
        first: usize,
        last: usize,
        count: usize,
    },

    /// The solver stopped without a usable result.
    #[error("Fit failed: {0}")]
    SolverFailure(String),

    /// A model formula or script could not be evaluated.
    #[error("Model evaluation failed: {0}")]
    Evaluation(String),

    /// The fit was interrupted through its cancellation token.
    #[error("Fit cancelled")]
    Cancelled,

    /// Unknown model id or an unusable model list.
    #[error("Model composition failed: {0}")]
    Compose(#[from] crate::model::ComposeError),

    /// A catalog entry failed validation.
    #[error("Model registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Error indicating a mismatch in array dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ParameterError> for FitError {
    fn from(err: ParameterError) -> Self {
        match err {
            ParameterError::ParameterNotFound { ref name }
            | ParameterError::CircularDependency { ref name }
            | ParameterError::ExpressionEvaluation { ref name, .. } => FitError::LinkingScheme {
                parameter: name.clone(),
                message: err.to_string(),
            },
            other => FitError::InvalidParameters(other.to_string()),
        }
    }
}

impl From<BoundsError> for FitError {
    fn from(err: BoundsError) -> Self {
        FitError::InvalidParameters(err.to_string())
    }
}

impl From<ExpressionError> for FitError {
    fn from(err: ExpressionError) -> Self {
        FitError::Evaluation(err.to_string())
    }
}

/// Result type alias for globfit operations.
pub type Result<T> = std::result::Result<T, FitError>;
