use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::history::resolve_session_id;
use crate::rag::QueryRequest;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryBody {
    pub question: Option<String>,
    pub conversation_id: Option<String>,
    pub system_prompt: Option<String>,
}

/// A missing or unparseable body is treated as an empty question.
pub async fn query_with_embedding(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let body: QueryBody = body
        .and_then(|Json(value)| serde_json::from_value(value).ok())
        .unwrap_or_default();
    let session_id =
        resolve_session_id(body.conversation_id.as_deref(), &headers, Some(peer.ip()));
    let request = QueryRequest {
        question: body.question.unwrap_or_default(),
        session_id,
        system_prompt: body.system_prompt,
    };

    let outcome = state.query.answer(request).await.map_err(|err| {
        tracing::warn!("Query failed: {}", err);
        ApiError::from(err)
    })?;
    Ok(Json(outcome))
}
