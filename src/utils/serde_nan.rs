//! Serde adapters writing NaN as `null`.
//!
//! JSON has no NaN. Use with `#[serde(with = "crate::utils::serde_nan")]`
//! on `f64` fields and `serde_nan::vec` on `Vec<f64>` fields.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn wrap(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    wrap(*value).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

pub mod vec {
    use super::wrap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let wrapped: Vec<Option<f64>> = values.iter().copied().map(wrap).collect();
        wrapped.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
