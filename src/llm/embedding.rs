//! CLOVA Studio embedding client.
//!
//! The endpoint has shipped several response shapes over time, so the vector
//! is located by probing an ordered list of JSON paths.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};

use super::http::{as_count, request_id, snippet, with_bearer, REQUEST_ID_HEADER};
use super::provider::Embedder;
use super::usage::UsageCounters;
use crate::core::errors::RagError;

const SERVICE: &str = "embedding";
const ENVELOPE_OK: u64 = 20000;

#[derive(Debug, Clone, Copy)]
enum Step {
    Key(&'static str),
    Index(usize),
}

/// One candidate location of the embedding vector inside a response.
#[derive(Debug, Clone, Copy)]
pub struct VectorPath {
    pub label: &'static str,
    steps: &'static [Step],
}

impl VectorPath {
    const fn new(label: &'static str, steps: &'static [Step]) -> Self {
        Self { label, steps }
    }

    /// Returns the vector at this path, or at its `values` / `vector` sub-key.
    pub fn extract(&self, payload: &Value) -> Option<Vec<f32>> {
        let mut current = payload;
        for step in self.steps {
            current = match step {
                Step::Key(key) => current.get(*key)?,
                Step::Index(index) => current.get(*index)?,
            };
        }
        numeric_vector(current)
            .or_else(|| current.get("values").and_then(numeric_vector))
            .or_else(|| current.get("vector").and_then(numeric_vector))
    }
}

pub const VECTOR_PATHS: &[VectorPath] = &[
    VectorPath::new("result.embedding", &[Step::Key("result"), Step::Key("embedding")]),
    VectorPath::new("embedding", &[Step::Key("embedding")]),
    VectorPath::new(
        "result.embeddings[0]",
        &[Step::Key("result"), Step::Key("embeddings"), Step::Index(0)],
    ),
    VectorPath::new("embeddings[0]", &[Step::Key("embeddings"), Step::Index(0)]),
    VectorPath::new(
        "result.embeddings[0].values",
        &[
            Step::Key("result"),
            Step::Key("embeddings"),
            Step::Index(0),
            Step::Key("values"),
        ],
    ),
    VectorPath::new(
        "result.embeddings[0].vector",
        &[
            Step::Key("result"),
            Step::Key("embeddings"),
            Step::Index(0),
            Step::Key("vector"),
        ],
    ),
    VectorPath::new(
        "embeddings[0].values",
        &[Step::Key("embeddings"), Step::Index(0), Step::Key("values")],
    ),
    VectorPath::new(
        "embeddings[0].vector",
        &[Step::Key("embeddings"), Step::Index(0), Step::Key("vector")],
    ),
];

/// First path that yields a non-empty numeric sequence wins.
pub fn extract_embedding(payload: &Value) -> Option<Vec<f32>> {
    VECTOR_PATHS.iter().find_map(|path| path.extract(payload))
}

fn numeric_vector(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_f64().map(|f| f as f32))
        .collect()
}

fn input_tokens(payload: &Value) -> u64 {
    [
        &payload["result"]["inputTokens"],
        &payload["inputTokens"],
        &payload["result"]["usage"]["inputTokens"],
        &payload["usage"]["inputTokens"],
    ]
    .into_iter()
    .find_map(as_count)
    .unwrap_or(0)
}

fn envelope_message(payload: &Value) -> Option<&str> {
    payload["status"]["message"]
        .as_str()
        .or_else(|| payload["message"].as_str())
}

/// CLOVA wraps results in `{status: {code, message}}`; an absent code counts as success.
fn check_envelope(payload: &Value) -> Result<(), RagError> {
    let code = match &payload["status"]["code"] {
        Value::Null => &payload["code"],
        code => code,
    };
    if code.is_null() || as_count(code) == Some(ENVELOPE_OK) {
        return Ok(());
    }
    Err(RagError::Upstream {
        service: SERVICE,
        status: None,
        message: format!(
            "status={} message={}",
            code,
            envelope_message(payload).unwrap_or("(no message)")
        ),
    })
}

#[derive(Clone)]
pub struct ClovaEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    usage: Arc<UsageCounters>,
}

impl ClovaEmbeddingClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        usage: Arc<UsageCounters>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            usage,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/api-tools/embedding/{}", self.base_url, self.model)
    }

    async fn post(&self, body: &Value) -> Result<Response, RagError> {
        let request = self
            .client
            .post(self.endpoint())
            .header(REQUEST_ID_HEADER, request_id("emb"))
            .json(body);
        with_bearer(request, self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| RagError::upstream(SERVICE, e))
    }
}

#[async_trait]
impl Embedder for ClovaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyInput);
        }

        let mut response = self.post(&json!({ "text": text })).await?;
        if response.status().is_client_error() {
            tracing::debug!(
                "Embedding single-text request rejected ({}), retrying with texts[]",
                response.status()
            );
            response = self.post(&json!({ "texts": [text] })).await?;
        }

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| RagError::upstream(SERVICE, e))?;

        let payload: Value = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(RagError::Upstream {
                    service: SERVICE,
                    status: Some(status.as_u16()),
                    message: snippet(&raw),
                });
            }
            Err(_) => {
                return Err(RagError::malformed(
                    SERVICE,
                    format!("invalid JSON: {}", snippet(&raw)),
                ));
            }
        };

        if !status.is_success() {
            return Err(RagError::Upstream {
                service: SERVICE,
                status: Some(status.as_u16()),
                message: envelope_message(&payload)
                    .map(str::to_string)
                    .unwrap_or_else(|| snippet(&raw)),
            });
        }
        check_envelope(&payload)?;

        let tokens = input_tokens(&payload);
        self.usage.record_embedding(tokens);
        tracing::debug!("[embed] inputTokens={}", tokens);

        extract_embedding(&payload)
            .ok_or_else(|| RagError::malformed(SERVICE, "response missing vector"))
    }
}
