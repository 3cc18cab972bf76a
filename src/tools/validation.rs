//! Validate tool call arguments against JSON Schema before any network call.

use serde_json::{Map, Value};

/// Normalize raw arguments into an object.
///
/// `null` means "no arguments"; anything else that is not an object is rejected.
pub fn normalize_arguments(args: &Value) -> Result<Map<String, Value>, String> {
    match args {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(format!(
            "expected object arguments, got {}",
            json_type_name(other)
        )),
    }
}

/// Validate tool arguments against a JSON Schema.
///
/// Checks required field presence (a `null` value counts as absent) and the
/// primitive type of every declared property. Undeclared fields are ignored.
pub fn validate_arguments(args: &Map<String, Value>, schema: &Value) -> Result<(), String> {
    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for name in required.iter().filter_map(|field| field.as_str()) {
            if args.get(name).map_or(true, Value::is_null) {
                return Err(format!("missing required field '{name}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
        for (key, value) in args {
            if value.is_null() {
                continue;
            }
            let Some(expected_type) = properties
                .get(key)
                .and_then(|prop| prop.get("type"))
                .and_then(|v| v.as_str())
            else {
                continue;
            };
            if !value_matches_type(value, expected_type) {
                return Err(format!(
                    "field '{}' expected type '{}', got {}",
                    key,
                    expected_type,
                    json_type_name(value)
                ));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
