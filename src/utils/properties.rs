//! Property map access and value conversion utilities.
//!
//! Pools, resources and requests travel as JSON-shaped maps. Hosts are not
//! consistent about numeric encoding, so integers are accepted either as JSON
//! numbers or as decimal text.

use serde_json::{Map, Value};

/// A named-property map as supplied by the host.
pub type Properties = Map<String, Value>;

/// Read a non-negative integer from a number or decimal text.
/// - Number(n >= 0) -> n
/// - String("123") -> 123
/// - anything else -> None
pub fn value_as_u128(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a signed integer from a number or decimal text.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// True if the value is a negative number or negative decimal text.
pub fn value_is_negative(value: &Value) -> bool {
    value_as_i64(value).is_some_and(|n| n < 0)
}

/// Render a value for substitution into a text template.
/// - String(s) -> s
/// - Number(n) -> n
/// - Bool(b) -> "true"/"false"
/// - other -> its JSON text
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

pub fn get_str<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(Value::as_str)
}

pub fn get_u128(properties: &Properties, key: &str) -> Option<u128> {
    properties.get(key).and_then(value_as_u128)
}

pub fn get_i64(properties: &Properties, key: &str) -> Option<i64> {
    properties.get(key).and_then(value_as_i64)
}
