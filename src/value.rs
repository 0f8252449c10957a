//! Typed setting values.
//!
//! Stored values are strings. A setting's declared [`ValueKind`] selects one
//! conversion from a closed table; there is no runtime type inspection.
//!
//! | kind      | stored form          | parsed as            |
//! |-----------|----------------------|----------------------|
//! | `Text`    | any string           | `String`             |
//! | `Bool`    | `true` / `false`     | `bool` (ASCII case-insensitive) |
//! | `Integer` | `-42`                | `i64`                |
//! | `Float`   | `0.25`               | `f64`                |
//! | `Json`    | `[5, 8, 13]`         | `serde_json::Value`  |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Bool,
    Integer,
    Float,
    Json,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Bool => write!(f, "bool"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl ValueKind {
    /// Convert a stored string into a typed value.
    ///
    /// The error string describes why the conversion failed.
    pub fn parse(self, raw: &str) -> Result<SettingValue, String> {
        match self {
            Self::Text => Ok(SettingValue::Text(raw.to_string())),
            Self::Bool => match raw.trim() {
                s if s.eq_ignore_ascii_case("true") => Ok(SettingValue::Bool(true)),
                s if s.eq_ignore_ascii_case("false") => Ok(SettingValue::Bool(false)),
                _ => Err("expected true or false".to_string()),
            },
            Self::Integer => raw
                .trim()
                .parse::<i64>()
                .map(SettingValue::Integer)
                .map_err(|e| e.to_string()),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .map(SettingValue::Float)
                .map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str::<Value>(raw)
                .map(SettingValue::Json)
                .map_err(|e| e.to_string()),
        }
    }
}

/// A converted setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Json(Value),
}

impl SettingValue {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Json(_) => ValueKind::Json,
        }
    }

    /// The string form written to a store.
    #[must_use]
    pub fn to_stored(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Json(v) => v.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for SettingValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}
