//! Field-level extraction for JSON request bodies.
//!
//! Bodies are parsed leniently (anything that is not a JSON object counts as
//! an empty one) and individual fields are checked by hand, so that every
//! validation failure produces the same 400 problem response instead of the
//! extractor-specific status an `axum::Json<T>` would raise.

use serde_json::{Map, Value};

use crate::problem::ProblemResponse;

/// Parses a request body, treating malformed JSON as an empty object so the
/// subsequent required-field checks produce the real error message.
pub fn parse(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}

/// Reads an integer-valued field, accepting numeric strings the way form
/// clients submit them.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn missing(field: &str) -> ProblemResponse {
    ProblemResponse::validation(format!("{field} is required"))
}

/// Requires an integer field.
pub fn require_integer(body: &Value, field: &str) -> Result<i64, ProblemResponse> {
    let value = body.get(field).ok_or_else(|| missing(field))?;
    as_integer(value)
        .ok_or_else(|| ProblemResponse::validation(format!("{field} must be an integer")))
}

/// Requires a numeric field.
pub fn require_number(body: &Value, field: &str) -> Result<f64, ProblemResponse> {
    let value = body.get(field).ok_or_else(|| missing(field))?;
    as_number(value).ok_or_else(|| ProblemResponse::validation(format!("{field} must be a number")))
}

/// Requires a string field.
pub fn require_string(body: &Value, field: &str) -> Result<String, ProblemResponse> {
    let value = body.get(field).ok_or_else(|| missing(field))?;
    as_string(value)
        .ok_or_else(|| ProblemResponse::validation(format!("{field} must be a string")))
}

/// Reads an optional string field, rejecting present-but-mistyped values.
pub fn optional_string(body: &Value, field: &str) -> Result<Option<String>, ProblemResponse> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_string(value)
            .map(Some)
            .ok_or_else(|| ProblemResponse::validation(format!("{field} must be a string"))),
    }
}

/// Reads an optional numeric field.
pub fn optional_number(body: &Value, field: &str) -> Result<Option<f64>, ProblemResponse> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_number(value)
            .map(Some)
            .ok_or_else(|| ProblemResponse::validation(format!("{field} must be a number"))),
    }
}

/// Reads an optional integer field.
pub fn optional_integer(body: &Value, field: &str) -> Result<Option<i64>, ProblemResponse> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_integer(value)
            .map(Some)
            .ok_or_else(|| ProblemResponse::validation(format!("{field} must be an integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_bodies_become_empty_objects() {
        assert_eq!(parse(b"not json"), json!({}));
        assert_eq!(parse(b"[1, 2]"), json!({}));
        assert_eq!(parse(b"{\"a\": 1}"), json!({"a": 1}));
    }

    #[test]
    fn integers_accept_numbers_and_numeric_strings() {
        let body = json!({"id": 7, "raw": "12", "bad": "twelve"});
        assert_eq!(require_integer(&body, "id").unwrap(), 7);
        assert_eq!(require_integer(&body, "raw").unwrap(), 12);
        assert!(require_integer(&body, "bad").is_err());
        assert!(require_integer(&body, "absent").is_err());
    }

    #[test]
    fn numbers_accept_integers_and_floats() {
        let body = json!({"cgpa": 8.5, "whole": 9, "text": "7.25"});
        assert_eq!(require_number(&body, "cgpa").unwrap(), 8.5);
        assert_eq!(require_number(&body, "whole").unwrap(), 9.0);
        assert_eq!(require_number(&body, "text").unwrap(), 7.25);
    }

    #[test]
    fn optional_fields_distinguish_absent_from_mistyped() {
        let body = json!({"name": 3});
        assert_eq!(optional_string(&body, "missing").unwrap(), None);
        assert!(optional_string(&body, "name").is_err());
    }
}
