//! Parsing of per-vector descriptor entries.
//!
//! A vector descriptor is one semantic-similarity probe: the text to embed
//! plus optional nearest-neighbor count, blending weight, and rewrite
//! directive. Callers may pass descriptors as newline-separated strings, a
//! JSON array encoded in a string, or a native array mixing bare strings and
//! `[text, k, weight, rewrites]` tuples.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::stringify;

/// One semantic-similarity probe, as supplied by the caller.
///
/// `k`, `weight`, and `rewrites` are filled with resolved defaults by the
/// query composer; the descriptor is never mutated after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDescriptor {
    pub text: String,
    pub k: Option<u32>,
    pub weight: Option<f64>,
    pub rewrites: Option<String>,
}

impl VectorDescriptor {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            k: None,
            weight: None,
            rewrites: None,
        }
    }
}

/// Parse caller-supplied vector input into an ordered list of descriptors.
///
/// Unlike numeric list normalization, malformed `k`/`weight` tokens here are
/// non-fatal: the token is logged and the field left unset, and the call
/// proceeds with defaults.
pub fn parse_vectors(value: Option<&Value>) -> Vec<VectorDescriptor> {
    let mut descriptors = Vec::new();

    let Some(value) = value else {
        return descriptors;
    };

    match value {
        Value::Null => {}
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return descriptors;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
                    for item in &items {
                        parse_entry(item, &mut descriptors);
                    }
                    return descriptors;
                }
            }

            for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
                parse_entry(&Value::String(line.to_string()), &mut descriptors);
            }
        }
        Value::Array(items) => {
            for item in items {
                parse_entry(item, &mut descriptors);
            }
        }
        other => parse_entry(other, &mut descriptors),
    }

    descriptors
}

fn parse_entry(entry: &Value, out: &mut Vec<VectorDescriptor>) {
    match entry {
        Value::Null => {}
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return;
            }
            // A string entry may itself hold a JSON tuple.
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                if let Ok(parsed @ Value::Array(_)) = serde_json::from_str::<Value>(trimmed) {
                    parse_entry(&parsed, out);
                    return;
                }
            }
            out.push(VectorDescriptor::text_only(trimmed));
        }
        Value::Array(parts) => {
            let Some(first) = parts.first() else {
                return;
            };
            let text = stringify(first);
            if text.is_empty() {
                return;
            }

            let k = parts.get(1).and_then(parse_k);
            let weight = parts.get(2).and_then(parse_weight);
            let rewrites = parts.get(3).and_then(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(stringify(other)),
            });

            out.push(VectorDescriptor {
                text,
                k,
                weight,
                rewrites,
            });
        }
        other => {
            let text = stringify(other);
            if !text.is_empty() {
                out.push(VectorDescriptor::text_only(text));
            }
        }
    }
}

fn parse_k(value: &Value) -> Option<u32> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Number(n) => match n.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(k) => Some(k),
            None => {
                tracing::warn!("unable to parse vector k from '{n}'");
                None
            }
        },
        other => {
            let token = stringify(other);
            match token.parse::<u32>() {
                Ok(k) => Some(k),
                Err(_) => {
                    tracing::warn!("unable to parse vector k from '{token}'");
                    None
                }
            }
        }
    }
}

fn parse_weight(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Number(n) => n.as_f64(),
        other => {
            let token = stringify(other);
            match token.parse::<f64>() {
                Ok(w) => Some(w),
                Err(_) => {
                    tracing::warn!("unable to parse vector weight from '{token}'");
                    None
                }
            }
        }
    }
}
