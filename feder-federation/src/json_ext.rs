//! Helpers over the `serde_json_bytes` value model.

use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Name of the JSON kind of `value`, for diagnostics.
pub fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders an identifier the way `_Any` representations carry it.
///
/// Strings are taken as is, every other value uses its JSON text.
pub fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.as_str().to_string(),
        Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::Array(_)
        | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
