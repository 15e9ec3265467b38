//! Parameter bounds and the bound-removing variable transform.
//!
//! The solver works on unconstrained internal coordinates. Each bounded
//! parameter is mapped through a Minuit-style transform so that every
//! internal value corresponds to an external value inside `[min, max]`.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors raised when building or applying bounds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Value {value} lies outside [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Non-finite parameter value {0}")]
    NonFiniteValue(f64),
}

/// Closed interval a parameter value must stay in. Either end may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

// Infinite ends are written as `null` so the JSON stays portable.
impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let finite_or_none = |v: f64| if v.is_finite() { Some(v) } else { None };

        let mut state = serializer.serialize_struct("Bounds", 2)?;
        state.serialize_field("min", &finite_or_none(self.min))?;
        state.serialize_field("max", &finite_or_none(self.max))?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            min: Option<f64>,
            #[serde(default)]
            max: Option<f64>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Bounds::new(
            raw.min.unwrap_or(NEG_INFINITY),
            raw.max.unwrap_or(INFINITY),
        )
        .map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Bounds {
    /// Create bounds, rejecting `min > max` and NaN ends.
    ///
    /// ```
    /// use globfit::parameters::Bounds;
    ///
    /// let b = Bounds::new(0.0, f64::INFINITY).unwrap();
    /// assert!(b.has_lower_bound());
    /// assert!(!b.has_upper_bound());
    /// assert!(Bounds::new(2.0, 1.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn unbounded() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }

    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Minuit-style mapping between external (bounded) and internal
/// (unbounded) coordinates.
///
/// * lower bound only: `ext = min - 1 + sqrt(int² + 1)`
/// * upper bound only: `ext = max + 1 - sqrt(int² + 1)`
/// * both: `ext = min + (sin(int) + 1)(max - min)/2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn to_external(&self, internal: f64) -> f64 {
        let Bounds { min, max } = self.bounds;
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => internal,
            (true, false) => min - 1.0 + (internal * internal + 1.0).sqrt(),
            (false, true) => max + 1.0 - (internal * internal + 1.0).sqrt(),
            (true, true) => min + (internal.sin() + 1.0) * (max - min) / 2.0,
        }
    }

    /// Inverse of [`to_external`](Self::to_external).
    ///
    /// Values outside the bounds are rejected; non-finite values too.
    pub fn to_internal(&self, external: f64) -> Result<f64, BoundsError> {
        if !external.is_finite() {
            return Err(BoundsError::NonFiniteValue(external));
        }
        let Bounds { min, max } = self.bounds;
        if !self.bounds.contains(external) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external,
                min,
                max,
            });
        }

        let internal = match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => external,
            (true, false) => ((external - min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((max - external + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                if max == min {
                    0.0
                } else {
                    (2.0 * (external - min) / (max - min) - 1.0)
                        .clamp(-1.0, 1.0)
                        .asin()
                }
            }
        };
        Ok(internal)
    }

    /// `d(external)/d(internal)` evaluated at an internal coordinate.
    pub fn derivative(&self, internal: f64) -> f64 {
        let Bounds { min, max } = self.bounds;
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => 1.0,
            (true, false) => internal / (internal * internal + 1.0).sqrt(),
            (false, true) => -internal / (internal * internal + 1.0).sqrt(),
            (true, true) => internal.cos() * (max - min) / 2.0,
        }
    }
}
