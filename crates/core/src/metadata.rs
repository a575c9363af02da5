//! Open, per-step metadata payload.
//!
//! Producers attach whatever keys make sense for a step, so nothing here
//! assumes a fixed schema. Every accessor returns `None` for a missing key,
//! a wrong type, or an empty string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conventional metadata keys written by the media pipeline.
pub mod keys {
    pub const OPERATION_TYPE: &str = "operationType";
    pub const USER_ID: &str = "userId";
    pub const USERNAME: &str = "username";
    pub const ORIGINAL_URL: &str = "originalUrl";
    pub const FILE_SIZE: &str = "fileSize";
    pub const ERROR: &str = "error";
    pub const STACK_TRACE: &str = "stackTrace";
}

/// Placeholder producers write when they could not determine a value.
/// Never surfaced in a derived snapshot.
pub const UNKNOWN: &str = "unknown";

/// Returns `true` for strings that carry no information.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN)
}

/// Why a stored payload could not be used as metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metadata must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// A JSON object with lenient, typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored JSON payload. Only objects are accepted.
    pub fn parse(raw: &str) -> Result<Self, MetadataError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::try_from_value(value)
    }

    /// Wrap an already-decoded JSON value. Only objects are accepted.
    pub fn try_from_value(value: Value) -> Result<Self, MetadataError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(MetadataError::NotAnObject("null")),
            Value::Bool(_) => Err(MetadataError::NotAnObject("bool")),
            Value::Number(_) => Err(MetadataError::NotAnObject("number")),
            Value::String(_) => Err(MetadataError::NotAnObject("string")),
            Value::Array(_) => Err(MetadataError::NotAnObject("array")),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string value.
    pub fn str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// String value, rendering numbers as text. Chat platforms hand out
    /// numeric user ids that some producers store unquoted.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Non-placeholder string value (see [`is_placeholder`]).
    pub fn known_str(&self, key: &str) -> Option<&str> {
        self.str(key).filter(|s| !is_placeholder(s))
    }

    /// Integer value. Accepts JSON integers, integral floats and numeric
    /// strings.
    pub fn i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Serialize for storage.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
