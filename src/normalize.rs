//! Canonicalization of union-shaped list parameters.
//!
//! Tool callers may pass list-valued parameters as a native JSON array, a
//! comma/newline-delimited string, or a JSON array encoded inside a string.
//! Everything is reduced to a typed `Vec` here, at the transport boundary,
//! so the composer never has to re-inspect input shapes.

use crate::error::{BridgeError, Result};
use serde_json::Value;

/// Normalize a union-shaped value into a list via the given element parser.
///
/// - `None`/null produce an empty list.
/// - Native arrays are parsed element-wise with nulls dropped, order kept.
/// - Strings are trimmed; bracket-delimited strings are first tried as a
///   JSON array, falling back to comma/newline splitting on parse failure.
/// - Any other scalar becomes a single-element list.
pub fn normalize<T>(value: Option<&Value>, parse: &dyn Fn(&Value) -> Result<T>) -> Result<Vec<T>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().filter(|v| !v.is_null()).map(parse).collect(),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(Vec::new());
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
                    return items.iter().filter(|v| !v.is_null()).map(parse).collect();
                }
            }

            trimmed
                .split(['\n', ','])
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| parse(&Value::String(part.to_string())))
                .collect()
        }
        other => Ok(vec![parse(other)?]),
    }
}

/// Render any scalar the way a caller would expect it spelled.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Normalize into a list of trimmed strings.
pub fn string_list(value: Option<&Value>) -> Result<Vec<String>> {
    normalize(value, &|item| Ok(stringify(item)))
}

/// Normalize into a list of integers.
///
/// Malformed tokens abort the call: integer lists drive backend index
/// behavior, so silently dropping an element would skew the query.
pub fn int_list(value: Option<&Value>) -> Result<Vec<i64>> {
    normalize(value, &|item| match item {
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            BridgeError::InvalidInput(format!("Unable to parse integer from '{n}'"))
        }),
        other => {
            let token = stringify(other);
            token
                .parse::<i64>()
                .map_err(|_| BridgeError::InvalidInput(format!("Unable to parse integer from '{token}'")))
        }
    })
}

/// Normalize into a list of floats. Malformed tokens abort the call.
pub fn float_list(value: Option<&Value>) -> Result<Vec<f64>> {
    normalize(value, &|item| match item {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            BridgeError::InvalidInput(format!("Unable to parse float from '{n}'"))
        }),
        other => {
            let token = stringify(other);
            token
                .parse::<f64>()
                .map_err(|_| BridgeError::InvalidInput(format!("Unable to parse float from '{token}'")))
        }
    })
}

/// Drop empty entries and return `None` when nothing remains.
///
/// Used when a field list is only meaningful non-empty; the backend treats
/// omission as "use your own defaults".
pub fn field_list_value(values: &[String]) -> Option<Vec<String>> {
    let cleaned: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Render the vector field selector expected by the backend (comma-separated).
pub fn vector_field_selector(values: &[String]) -> String {
    match field_list_value(values) {
        Some(cleaned) => cleaned.join(","),
        None => "text_vector".to_string(),
    }
}
