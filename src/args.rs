//! Tool argument extraction.
//!
//! Helpers that pull typed values out of a `tools/call` argument object and
//! turn absent or ill-typed values into `MissingArg` / `InvalidArg` errors.

use serde_json::{Map, Value as JsonValue};

use crate::error::{McpError, Result};

/// Helper to get a required string argument from JSON arguments.
pub fn get_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    match args.get(name) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Null) | None => Err(McpError::MissingArg(name.to_string())),
        Some(_) => Err(McpError::InvalidArg {
            name: name.to_string(),
            reason: "Expected a string".to_string(),
        }),
    }
}

/// Helper to get a required, non-blank string argument.
pub fn get_non_empty_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    let value = get_string_arg(args, name)?;
    if value.trim().is_empty() {
        return Err(McpError::MissingArg(name.to_string()));
    }
    Ok(value)
}

/// Helper to get an optional string argument from JSON arguments.
pub fn get_optional_string(args: &Map<String, JsonValue>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Helper to get an optional u64 argument from JSON arguments.
///
/// Integral floats such as `10.0` are accepted since some clients only emit doubles.
pub fn get_optional_u64(args: &Map<String, JsonValue>, name: &str) -> Result<Option<u64>> {
    match args.get(name) {
        Some(JsonValue::Null) | None => Ok(None),
        Some(v) => v
            .as_u64()
            .or_else(|| {
                v.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .map(Some)
            .ok_or_else(|| McpError::InvalidArg {
                name: name.to_string(),
                reason: "Expected a non-negative integer".to_string(),
            }),
    }
}

/// Helper to get an optional i64 argument from JSON arguments.
pub fn get_optional_i64(args: &Map<String, JsonValue>, name: &str) -> Result<Option<i64>> {
    match args.get(name) {
        Some(JsonValue::Null) | None => Ok(None),
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| McpError::InvalidArg {
                name: name.to_string(),
                reason: "Expected an integer".to_string(),
            }),
    }
}

/// Helper to get an optional boolean argument.
pub fn get_optional_bool(args: &Map<String, JsonValue>, name: &str) -> Option<bool> {
    args.get(name).and_then(|v| v.as_bool())
}

/// Helper to get a required array of strings.
pub fn get_string_array_arg(args: &Map<String, JsonValue>, name: &str) -> Result<Vec<String>> {
    let arr = args
        .get(name)
        .and_then(|v| v.as_array())
        .ok_or_else(|| McpError::MissingArg(name.to_string()))?;

    arr.iter()
        .map(|v| {
            v.as_str().map(|s| s.to_string()).ok_or_else(|| McpError::InvalidArg {
                name: name.to_string(),
                reason: "Expected array of strings".to_string(),
            })
        })
        .collect()
}

/// Helper to get an optional JSON object argument.
pub fn get_optional_object<'a>(
    args: &'a Map<String, JsonValue>,
    name: &str,
) -> Result<Option<&'a Map<String, JsonValue>>> {
    match args.get(name) {
        Some(JsonValue::Null) | None => Ok(None),
        Some(JsonValue::Object(obj)) => Ok(Some(obj)),
        Some(_) => Err(McpError::InvalidArg {
            name: name.to_string(),
            reason: "Expected an object".to_string(),
        }),
    }
}
