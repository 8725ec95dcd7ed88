use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use uuid::Uuid;

use super::protocol::{error_reply, reply, reset_reply, WsCommand};
use crate::core::errors::ApiError;
use crate::rag::QueryRequest;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One session per connection, dropped when the socket closes.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    tracing::info!("[socket] connected: {}", session_id);
    state.conversations.session(&session_id);

    let (mut sender, mut receiver) = socket.split();
    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let payload = handle_message(&state, &session_id, &text).await;
        if let Err(err) = send_json(&mut sender, payload).await {
            tracing::warn!("[socket] {} send failed: {}", session_id, err);
            break;
        }
    }

    state.conversations.remove(&session_id);
    tracing::info!("[socket] disconnected: {}", session_id);
}

async fn handle_message(state: &AppState, session_id: &str, text: &str) -> Value {
    match WsCommand::parse(text) {
        WsCommand::Reset => {
            state.conversations.reset(session_id).await;
            reset_reply()
        }
        WsCommand::Ask {
            question,
            system_prompt,
        } => {
            let request = QueryRequest {
                question,
                session_id: session_id.to_string(),
                system_prompt,
            };
            match state.query.answer(request).await {
                Ok(outcome) => reply(&outcome),
                Err(err) => {
                    tracing::warn!("[socket] {} query failed: {}", session_id, err);
                    error_reply(&err.to_string())
                }
            }
        }
    }
}

pub async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    payload: Value,
) -> Result<(), ApiError> {
    let text = serde_json::to_string(&payload).map_err(ApiError::internal)?;
    sender
        .send(Message::Text(text))
        .await
        .map_err(ApiError::internal)?;
    Ok(())
}
