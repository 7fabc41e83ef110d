// SPDX-License-Identifier: MIT

//! Helpers over `serde_json::Value`
//!
//! `Value::Null` doubles as "undefined": a missing path, a failed `find`
//! and a fan-out over a non-array all produce `Null`.

use serde_json::Value;

const INSPECT_LENGTH: usize = 30;

/// Values skipped by empty conditionals and replaced by `default`:
/// `null` and `false`. `0` and `""` are not falsy here.
pub fn is_falsy(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false))
}

/// Predicate truthiness used by `filter`, `find` and control `case`s
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Name of the JSON type of a value, used in type-mismatch messages
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compact single-line rendering of a value, truncated for error messages
pub fn inspect(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= INSPECT_LENGTH {
        return text;
    }
    let truncated: String = text.chars().take(INSPECT_LENGTH - 3).collect();
    format!("{}...", truncated)
}

/// Look up a dot-notation path. Missing segments yield `Null`, never an error.
///
/// An empty path (or `.`) returns the value itself. Numeric segments index
/// into arrays.
pub fn lookup(path: &str, value: &Value) -> Value {
    let path = path.trim_start_matches('.');
    if path.is_empty() {
        return value.clone();
    }

    let mut current = value;
    for part in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }

    current.clone()
}
