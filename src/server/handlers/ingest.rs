use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Rebuilds the vector store from the configured sheet.
///
/// Failures answer 500 with `{ok: false, error}`.
pub async fn pre_processing_for_embedding(State(state): State<Arc<AppState>>) -> Response {
    match state.ingestor.rebuild().await {
        Ok(count) => {
            state.usage.log_summary("after build");
            let file = state.ingestor.store().path().display().to_string();
            Json(json!({ "ok": true, "count": count, "file": file })).into_response()
        }
        Err(err) => {
            tracing::error!("Vector rebuild failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
