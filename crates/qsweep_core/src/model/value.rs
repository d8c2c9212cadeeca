//! Parameter values
//!
//! Values are deliberately small and serialisable: they are what sweep axes
//! carry, what configuration files contain, and what gets written into
//! parameter cells at every sweep point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single parameter value.
///
/// Serialised untagged, so configuration files can use plain scalars
/// (`1`, `0.5`, `true`, `"ground"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value (integers are widened)
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Interpret the value as a positive dimension.
    ///
    /// Floats are accepted when they hold an exact integer, since range-built
    /// sweep axes always produce floats.
    #[must_use]
    pub fn as_size(&self) -> Option<usize> {
        match self {
            Value::Int(v) if *v > 0 => usize::try_from(*v).ok(),
            Value::Float(v) if *v >= 1.0 && v.fract() == 0.0 && *v <= usize::MAX as f64 => {
                Some(*v as usize)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_size_accepts_integral_floats() {
        assert_eq!(Value::Float(4.0).as_size(), Some(4));
        assert_eq!(Value::Int(3).as_size(), Some(3));
        assert_eq!(Value::Float(2.5).as_size(), None);
        assert_eq!(Value::Int(0).as_size(), None);
        assert_eq!(Value::Float(-2.0).as_size(), None);
        assert_eq!(Value::from("two").as_size(), None);
    }

    #[test]
    fn test_untagged_json_scalars() {
        let values: Vec<Value> = serde_json::from_str(r#"[1, 0.5, true, "ground"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Float(0.5),
                Value::Bool(true),
                Value::Text("ground".to_string()),
            ]
        );
        assert_eq!(values[0].as_f64(), Some(1.0));
    }
}
