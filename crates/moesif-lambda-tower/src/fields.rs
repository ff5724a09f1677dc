//! Structural access to API Gateway proxy event documents.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Follows `path` through nested objects.
pub(crate) fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

/// Follows `path` and returns a non-empty string found there.
pub(crate) fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// The event's `headers` object, if it has one.
pub(crate) fn headers(event: &Value) -> Option<&Map<String, Value>> {
    event.get("headers").and_then(Value::as_object)
}

/// Case-insensitive header lookup.
pub(crate) fn header<'a>(headers: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
}

/// Flattens a header object into string pairs, rendering non-string values as JSON.
pub(crate) fn string_map(headers: Option<&Map<String, Value>>) -> HashMap<String, String> {
    headers
        .into_iter()
        .flatten()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}
