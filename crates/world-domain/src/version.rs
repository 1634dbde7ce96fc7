// version.rs
use crate::DocumentError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Versión de esquema: número real finito y no negativo. Un valor mayor
/// indica que más pasos de migración ya se aplicaron.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(transparent)]
pub struct SchemaVersion(f64);

impl SchemaVersion {
  pub const ZERO: SchemaVersion = SchemaVersion(0.0);

  pub fn new(value: f64) -> Result<Self, DocumentError> {
    if !value.is_finite() || value < 0.0 {
      return Err(DocumentError::InvalidVersion(value.to_string()));
    }
    // -0.0 y 0.0 deben ser la misma versión
    Ok(Self(if value == 0.0 { 0.0 } else { value }))
  }

  pub fn value(self) -> f64 {
    self.0
  }

  /// Lee una versión desde un valor JSON. `null` equivale a cero; se
  /// aceptan números y cadenas numéricas (exports antiguos).
  pub fn from_json(value: &JsonValue) -> Result<Self, DocumentError> {
    match value {
      JsonValue::Null => Ok(Self::ZERO),
      JsonValue::Number(n) => {
        let v = n.as_f64()
                 .ok_or_else(|| DocumentError::InvalidVersion(n.to_string()))?;
        Self::new(v)
      }
      JsonValue::String(s) => {
        let v = s.trim()
                 .parse::<f64>()
                 .map_err(|_| DocumentError::InvalidVersion(s.clone()))?;
        Self::new(v)
      }
      other => Err(DocumentError::InvalidVersion(other.to_string())),
    }
  }

  pub fn to_json(self) -> JsonValue {
    serde_json::Number::from_f64(self.0).map(JsonValue::Number)
                                        .unwrap_or(JsonValue::Null)
  }
}

impl TryFrom<f64> for SchemaVersion {
  type Error = DocumentError;

  fn try_from(value: f64) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl PartialEq for SchemaVersion {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for SchemaVersion {}

impl PartialOrd for SchemaVersion {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for SchemaVersion {
  fn cmp(&self, other: &Self) -> Ordering {
    self.0.total_cmp(&other.0)
  }
}

impl Hash for SchemaVersion {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.to_bits().hash(state);
  }
}

impl fmt::Display for SchemaVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl<'de> Deserialize<'de> for SchemaVersion {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de>
  {
    let raw = f64::deserialize(deserializer)?;
    SchemaVersion::new(raw).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn rejects_negative_and_non_finite() {
    assert!(SchemaVersion::new(-0.5).is_err());
    assert!(SchemaVersion::new(f64::NAN).is_err());
    assert!(SchemaVersion::new(f64::INFINITY).is_err());
    assert_eq!(SchemaVersion::new(-0.0).unwrap(), SchemaVersion::ZERO);
  }

  #[test]
  fn orders_fractional_versions() {
    let a = SchemaVersion::new(0.9).unwrap();
    let b = SchemaVersion::new(0.10).unwrap();
    let c = SchemaVersion::new(1.0).unwrap();
    assert!(b < a);
    assert!(a < c);
    assert_eq!(c.max(a), c);
  }

  #[test]
  fn reads_legacy_json_shapes() {
    assert_eq!(SchemaVersion::from_json(&json!(null)).unwrap(), SchemaVersion::ZERO);
    assert_eq!(SchemaVersion::from_json(&json!("0.75")).unwrap().value(), 0.75);
    assert_eq!(SchemaVersion::from_json(&json!(2)).unwrap().value(), 2.0);
    assert!(SchemaVersion::from_json(&json!({"v": 1})).is_err());
  }
}
