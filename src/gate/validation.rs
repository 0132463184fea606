//! Structural argument checks against a skill's JSON Schema.
//!
//! Only `required` and primitive `type` declarations on top-level
//! properties are enforced.

use serde_json::{json, Map, Value};

use crate::error::{ErrorCode, ToolError};

/// Checks `args` against `schema`. Returns the first violation.
pub fn validate_args(schema: &Value, args: &Map<String, Value>) -> Result<(), ToolError> {
    if let Some(required) = schema["required"].as_array() {
        for field in required.iter().filter_map(Value::as_str) {
            match args.get(field) {
                None | Some(Value::Null) => return Err(ToolError::missing_argument(field)),
                Some(_) => {}
            }
        }
    }

    let Some(properties) = schema["properties"].as_object() else {
        return Ok(());
    };

    for (field, property) in properties {
        let (Some(value), Some(expected)) = (args.get(field), property["type"].as_str()) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if !matches_type(value, expected) {
            return Err(ToolError::new(
                ErrorCode::InvalidArgument,
                format!(
                    "Argument '{field}' must be of type {expected}, got {}",
                    type_name(value)
                ),
            )
            .with_details(json!({ "field": field, "expected": expected })));
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        // Unknown type keywords are not enforced.
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
