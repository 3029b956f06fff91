//! Input formatters: raw parameter value in, typed value out.
//!
//! Front ends mostly deliver strings (query strings, form bodies), while JSON
//! bodies may already carry numbers and booleans. Each formatter accepts both.

use serde_json::Value;

/// Accepts strings, numbers and booleans and returns their string form.
pub fn ensure_string(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(format!("expected a string, got {}", kind_of(other))),
    }
}

/// Like [`ensure_string`], then lowercases.
pub fn lowercase(value: &Value) -> Result<Value, String> {
    match ensure_string(value)? {
        Value::String(s) => Ok(Value::String(s.to_lowercase())),
        other => Ok(other),
    }
}

/// Accepts booleans and `true`/`false`/`1`/`0` strings.
pub fn ensure_bool(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("`{s}` is not a boolean")),
        },
        other => Err(format!("expected a boolean, got {}", kind_of(other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
