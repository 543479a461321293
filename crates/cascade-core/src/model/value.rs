//! Attribute values and the conversions the engine needs from them

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Field name to value. Keys iterate in sorted order.
pub type Attributes = serde_json::Map<String, Value>;

/// Caller-supplied input for a record and its nested relations
pub type Payload = serde_json::Map<String, Value>;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Scalars are null, booleans, numbers and strings
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Render a value the way it appears inside a rule parameter list
pub fn to_param(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Missing, null, whitespace-only strings and empty collections
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// Storage key for a primary key value, if it can be one
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `YYYY-MM-DD HH:MM:SS` for `at`, or for now
pub fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.unwrap_or_else(Utc::now)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}
