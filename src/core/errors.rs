use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Domain errors raised by the retrieval pipeline and its remote clients.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("empty text for embedding")]
    EmptyInput,
    #[error("{0}")]
    InvalidInput(String),
    #[error("vector store not found at {}. Run /pre_processing_for_embedding first.", .0.display())]
    StoreNotFound(PathBuf),
    #[error("vector store is empty. Re-run /pre_processing_for_embedding.")]
    EmptyStore,
    #[error("no embeddings produced from source rows")]
    EmptyCorpus,
    #[error("{service} request failed{}: {message}", status_suffix(.status))]
    Upstream {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },
    #[error("{service} response malformed: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({})", code)).unwrap_or_default()
}

impl RagError {
    pub fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        RagError::Upstream {
            service,
            status: None,
            message: err.to_string(),
        }
    }

    pub fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        RagError::MalformedResponse {
            service,
            detail: detail.into(),
        }
    }

    /// True for failures the caller can fix by running ingestion first.
    pub fn is_precondition(&self) -> bool {
        matches!(self, RagError::StoreNotFound(_) | RagError::EmptyStore)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::EmptyInput | RagError::InvalidInput(_) => {
                ApiError::BadRequest(err.to_string())
            }
            RagError::StoreNotFound(_) | RagError::EmptyStore => {
                ApiError::BadRequest(err.to_string())
            }
            RagError::Upstream { .. } | RagError::MalformedResponse { .. } => {
                ApiError::BadGateway(err.to_string())
            }
            RagError::EmptyCorpus
            | RagError::Config(_)
            | RagError::Io(_)
            | RagError::Serialization(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_embeds_status() {
        let err = RagError::Upstream {
            service: "chat",
            status: Some(503),
            message: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "chat request failed (503): busy");
    }

    #[test]
    fn store_errors_map_to_bad_request() {
        let api: ApiError = RagError::EmptyStore.into();
        assert!(matches!(api, ApiError::BadRequest(_)));
        assert!(RagError::StoreNotFound(PathBuf::from("x.json")).is_precondition());
        assert!(!RagError::EmptyCorpus.is_precondition());
    }

    #[test]
    fn upstream_errors_map_to_bad_gateway() {
        let api: ApiError = RagError::malformed("embedding", "missing vector").into();
        assert!(matches!(api, ApiError::BadGateway(msg) if msg.contains("missing vector")));
    }
}
