//! Cache key builders
//!
//! Keys are a SHA-256 fingerprint over the normalized query plus a
//! canonical JSON rendering of the request parameters. Object keys are
//! sorted before hashing so semantically identical requests collide
//! regardless of field order.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a JSON value with object keys in sorted order
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{}}}", body)
        }
        Value::Array(items) => {
            let body = items.iter().map(canonical_json).collect::<Vec<_>>().join(",");
            format!("[{}]", body)
        }
        other => other.to_string(),
    }
}

/// Fingerprint a query and its parameters under a namespace
pub fn fingerprint<P: Serialize>(namespace: &str, query: &str, params: &P) -> String {
    let params = serde_json::to_value(params).unwrap_or(Value::Null);

    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update(b"\x1f");
    hasher.update(canonical_json(&params).as_bytes());
    let hash = hex::encode(hasher.finalize());

    format!("{}:{}", namespace, &hash[..32])
}
