//! Argument Extraction Helpers
//!
//! Typed lookups into a tool's argument object. Each helper takes a primary
//! (camelCase) key and an optional snake_case alias; `null` counts as absent.
//! A present value of the wrong type is an error, never silently ignored.

use serde_json::Value;

use crate::common::ToolError;

/// Arguments must be an object; a missing argument list is an empty object.
pub fn ensure_object(args: &Value) -> Result<(), ToolError> {
    match args {
        Value::Object(_) | Value::Null => Ok(()),
        other => Err(ToolError::invalid(format!(
            "tool arguments must be an object, got {}",
            type_name(other)
        ))),
    }
}

fn lookup<'a>(args: &'a Value, primary: &str, fallback: Option<&str>) -> Option<&'a Value> {
    args.get(primary)
        .filter(|v| !v.is_null())
        .or_else(|| fallback.and_then(|f| args.get(f)).filter(|v| !v.is_null()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract an optional string parameter with alias fallback
pub fn optional_string_or<'a>(
    args: &'a Value,
    primary: &str,
    fallback: Option<&str>,
) -> Result<Option<&'a str>, ToolError> {
    match lookup(args, primary, fallback) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::invalid(format!(
            "'{}' must be a string, got {}",
            primary,
            type_name(other)
        ))),
    }
}

/// Extract an optional string parameter
pub fn optional_string<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    optional_string_or(args, key, None)
}

/// Extract a required string parameter with alias fallback
pub fn require_string_or<'a>(
    args: &'a Value,
    primary: &str,
    fallback: Option<&str>,
) -> Result<&'a str, ToolError> {
    optional_string_or(args, primary, fallback)?.ok_or_else(|| match fallback {
        Some(f) => {
            ToolError::invalid(format!("missing required parameter: {} (or {})", primary, f))
        }
        None => ToolError::invalid(format!("missing required parameter: {}", primary)),
    })
}

/// Extract a required string parameter
pub fn require_string<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    require_string_or(args, key, None)
}

/// Required and non-blank, trimmed.
pub fn require_non_empty_or<'a>(
    args: &'a Value,
    primary: &str,
    fallback: Option<&str>,
) -> Result<&'a str, ToolError> {
    let value = require_string_or(args, primary, fallback)?.trim();
    if value.is_empty() {
        return Err(ToolError::invalid(format!("'{}' must not be empty", primary)));
    }
    Ok(value)
}

/// Extract an optional u64 parameter with alias fallback
pub fn optional_u64_or(
    args: &Value,
    primary: &str,
    fallback: Option<&str>,
) -> Result<Option<u64>, ToolError> {
    match lookup(args, primary, fallback) {
        None => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            ToolError::invalid(format!("'{}' must be a non-negative integer", primary))
        }),
    }
}

/// Extract a bool parameter with alias fallback and default
pub fn bool_or_with_default(
    args: &Value,
    primary: &str,
    fallback: Option<&str>,
    default: bool,
) -> Result<bool, ToolError> {
    match lookup(args, primary, fallback) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(ToolError::invalid(format!(
            "'{}' must be a boolean, got {}",
            primary,
            type_name(other)
        ))),
    }
}

/// Extract an optional list of strings. A single string is split on commas.
pub fn optional_string_list(args: &Value, key: &str) -> Result<Option<Vec<String>>, ToolError> {
    match lookup(args, key, None) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(String::from)
                .collect(),
        )),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| {
                        ToolError::invalid(format!("'{}' must contain only strings", key))
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(other) => Err(ToolError::invalid(format!(
            "'{}' must be an array of strings, got {}",
            key,
            type_name(other)
        ))),
    }
}
