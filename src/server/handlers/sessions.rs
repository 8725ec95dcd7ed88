use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::history::resolve_session_id;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetBody {
    pub conversation_id: Option<String>,
}

/// Clears one session's history. The body is optional.
pub async fn reset_conversation(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    let body: ResetBody = body
        .and_then(|Json(value)| serde_json::from_value(value).ok())
        .unwrap_or_default();
    let session_id =
        resolve_session_id(body.conversation_id.as_deref(), &headers, Some(peer.ip()));

    state.conversations.reset(&session_id).await;
    tracing::debug!("Conversation reset: {}", session_id);
    Json(json!({ "ok": true, "conversationId": session_id }))
}
