use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use uuid::Uuid;

use crate::core::errors::RagError;

pub const REQUEST_ID_HEADER: &str = "X-NCP-CLOVASTUDIO-REQUEST-ID";

const SNIPPET_CHARS: usize = 300;

pub fn build_client(timeout: Option<Duration>) -> Result<Client, RagError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))
}

pub fn request_id(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

pub fn with_bearer(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) if !key.is_empty() => request.bearer_auth(key),
        _ => request,
    }
}

pub fn snippet(raw: &str) -> String {
    raw.chars().take(SNIPPET_CHARS).collect()
}

/// Reads a counter that upstream services send either as a number or a numeric string.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_accept_numbers_and_strings() {
        assert_eq!(as_count(&json!(12)), Some(12));
        assert_eq!(as_count(&json!("7")), Some(7));
        assert_eq!(as_count(&json!(3.0)), Some(3));
        assert_eq!(as_count(&json!(null)), None);
        assert_eq!(as_count(&json!("n/a")), None);
    }

    #[test]
    fn snippet_is_char_bounded() {
        let long = "가".repeat(400);
        assert_eq!(snippet(&long).chars().count(), 300);
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(request_id("emb"), request_id("emb"));
        assert!(request_id("req").starts_with("req-"));
    }
}
