//! Payload decoding for event watches

use serde_json::{Map, Value};
use thiserror::Error;

/// Decoded record payload: field name to value
pub type Fields = Map<String, Value>;

/// Errors returned while decoding a payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is not valid JSON
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The payload is JSON but not an object
    #[error("payload is not an object, found {0}")]
    NotAnObject(&'static str),
}

/// Turns raw payload bytes into a field map
pub trait StructuredDecoder: Send + Sync {
    /// Decode `bytes`
    fn decode(&self, bytes: &[u8]) -> Result<Fields, DecodeError>;
}

/// [`StructuredDecoder`] for JSON object payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl StructuredDecoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Fields, DecodeError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        match value {
            Value::Object(fields) => Ok(fields),
            Value::Array(_) => Err(DecodeError::NotAnObject("array")),
            Value::String(_) => Err(DecodeError::NotAnObject("string")),
            Value::Number(_) => Err(DecodeError::NotAnObject("number")),
            Value::Bool(_) => Err(DecodeError::NotAnObject("bool")),
            Value::Null => Err(DecodeError::NotAnObject("null")),
        }
    }
}

/// Whether a decoded value equals the configured text.
///
/// Strings compare as-is, numbers and booleans by their text form. Nulls,
/// arrays and objects never match.
pub fn value_equals(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Render a value for a notification message.
///
/// A missing field renders as an empty string; arrays render as their
/// elements separated by spaces inside brackets.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(items)) => {
            let rendered: Vec<String> = items.iter().map(|item| render_value(Some(item))).collect();
            format!("[{}]", rendered.join(" "))
        }
        Some(object @ Value::Object(_)) => object.to_string(),
    }
}
