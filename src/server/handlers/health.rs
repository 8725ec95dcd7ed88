use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let settings = &state.settings;
    Json(json!({
        "ok": true,
        "appId": settings.app.app_id,
        "embedBase": settings.embed_base(),
        "chatBase": settings.chat_base(),
        "embedModel": settings.embedding.model,
        "chatModel": settings.chat.model,
        "topK": settings.retrieval.top_k,
        "maxHistory": settings.conversation.max_history,
        "usage": state.usage.snapshot(),
    }))
}
