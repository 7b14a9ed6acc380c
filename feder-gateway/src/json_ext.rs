//! Conversions between the engine value model and the wire value model.

use apollo_compiler::ast;
use async_graphql::Name;
use async_graphql::Value as ConstValue;
use serde_json_bytes::ByteString;
use serde_json_bytes::Value;

pub(crate) fn to_const_value(value: &Value) -> ConstValue {
    match value {
        Value::Null => ConstValue::Null,
        Value::Bool(boolean) => ConstValue::Boolean(*boolean),
        Value::Number(number) => ConstValue::Number(number.clone()),
        Value::String(string) => ConstValue::String(string.as_str().to_string()),
        Value::Array(items) => ConstValue::List(items.iter().map(to_const_value).collect()),
        Value::Object(object) => ConstValue::Object(
            object
                .iter()
                .map(|(key, value)| (Name::new(key.as_str()), to_const_value(value)))
                .collect(),
        ),
    }
}

pub(crate) fn from_const_value(value: &ConstValue) -> Value {
    match value {
        ConstValue::Null => Value::Null,
        ConstValue::Boolean(boolean) => Value::Bool(*boolean),
        ConstValue::Number(number) => Value::Number(number.clone()),
        ConstValue::String(string) => Value::String(string.as_str().into()),
        ConstValue::Enum(name) => Value::String(name.as_str().into()),
        ConstValue::Binary(bytes) => Value::Array(
            bytes
                .iter()
                .map(|byte| Value::Number((*byte).into()))
                .collect(),
        ),
        ConstValue::List(items) => Value::Array(items.iter().map(from_const_value).collect()),
        ConstValue::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (ByteString::from(key.as_str()), from_const_value(value)))
                .collect(),
        ),
    }
}

/// Converts a schema literal (an argument default value) to an engine value.
///
/// Returns `None` for literals that reference variables or overflow.
pub(crate) fn literal_to_const_value(value: &ast::Value) -> Option<ConstValue> {
    Some(match value {
        ast::Value::Null => ConstValue::Null,
        ast::Value::Enum(name) => ConstValue::Enum(Name::new(name.as_str())),
        ast::Value::Variable(_) => return None,
        ast::Value::String(string) => ConstValue::String(string.clone()),
        ast::Value::Float(float) => {
            ConstValue::Number(serde_json::Number::from_f64(float.try_to_f64().ok()?)?)
        }
        ast::Value::Int(int) => ConstValue::Number(int.try_to_i32().ok()?.into()),
        ast::Value::Boolean(boolean) => ConstValue::Boolean(*boolean),
        ast::Value::List(items) => ConstValue::List(
            items
                .iter()
                .map(|item| literal_to_const_value(item))
                .collect::<Option<_>>()?,
        ),
        ast::Value::Object(fields) => ConstValue::Object(
            fields
                .iter()
                .map(|(name, value)| {
                    Some((Name::new(name.as_str()), literal_to_const_value(value)?))
                })
                .collect::<Option<_>>()?,
        ),
    })
}
