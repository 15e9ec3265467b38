//! A single named fit parameter.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Cannot evaluate link expression for '{name}': {message}")]
    ExpressionEvaluation { name: String, message: String },

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter '{name}' already exists")]
    DuplicateParameter { name: String },

    #[error("Circular dependency in link expression for parameter '{name}'")]
    CircularDependency { name: String },

    #[error("Expected {expected} values for varying parameters, got {found}")]
    ValueCount { expected: usize, found: usize },
}

/// A named parameter with bounds, a free/fixed flag, and an optional link
/// expression that derives its value from other parameters.
///
/// A parameter with a link expression is never varied by the solver, whatever
/// its `vary` flag says.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: f64,
    pub vary: bool,
    bounds: Bounds,
    expr: Option<String>,
    pub stderr: Option<f64>,
}

impl Parameter {
    /// Create a free, unbounded parameter.
    ///
    /// ```
    /// use globfit::parameters::Parameter;
    ///
    /// let p = Parameter::new("Slope_1_1", 1.0);
    /// assert_eq!(p.value(), 1.0);
    /// assert!(p.is_free());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            vary: true,
            bounds: Bounds::unbounded(),
            expr: None,
            stderr: None,
        }
    }

    /// Create a bounded parameter. Values outside the bounds are pulled onto
    /// the nearest bound.
    pub fn with_bounds(name: &str, value: f64, bounds: Bounds) -> Self {
        let clamped = bounds.clamp(value);
        if clamped != value {
            log::warn!(
                "initial value {} of '{}' lies outside [{}, {}]; using {}",
                value,
                name,
                bounds.min,
                bounds.max,
                clamped
            );
        }
        Self {
            bounds,
            value: clamped,
            ..Self::new(name, value)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value, rejecting anything outside the bounds.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !self.bounds.contains(value) {
            return Err(BoundsError::ValueOutsideBounds {
                value,
                min: self.bounds.min,
                max: self.bounds.max,
            }
            .into());
        }
        self.value = value;
        Ok(())
    }

    /// Set the value, pulling it onto the bounds if needed.
    pub fn set_value_clamped(&mut self, value: f64) {
        self.value = self.bounds.clamp(value);
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn expr(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    /// Attach or clear a link expression. Blank text clears the link.
    pub fn set_expr(&mut self, expr: Option<&str>) {
        self.expr = expr
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
    }

    /// True when the solver moves this parameter directly.
    pub fn is_free(&self) -> bool {
        self.vary && self.expr.is_none()
    }

    pub fn bounds_transform(&self) -> BoundsTransform {
        BoundsTransform::new(self.bounds)
    }

    pub fn to_internal(&self) -> Result<f64, ParameterError> {
        Ok(self.bounds_transform().to_internal(self.value)?)
    }

    pub fn from_internal(&self, internal: f64) -> f64 {
        self.bounds_transform().to_external(internal)
    }
}
