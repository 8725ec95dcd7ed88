//! Per-session bounded conversation history.
//!
//! Each session owns an async lock. A query holds it from the history read
//! until its turns are appended, so two queries on one session run one after
//! the other.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;

use crate::llm::{ChatMessage, Role};

pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";
const USER_AGENT_PREFIX_CHARS: usize = 40;

#[derive(Debug, Clone)]
pub struct SessionHistory {
    messages: VecDeque<ChatMessage>,
    max_history: usize,
}

impl SessionHistory {
    fn new(max_history: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_history,
        }
    }

    /// Appends, then evicts the oldest entries beyond the bound.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push_back(ChatMessage::new(role, content));
        while self.messages.len() > self.max_history {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

pub type SessionHandle = Arc<tokio::sync::Mutex<SessionHistory>>;

pub struct ConversationStore {
    max_history: usize,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl ConversationStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Returns the session's handle, creating an empty history on first use.
    pub fn session(&self, session_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(SessionHistory::new(self.max_history))))
            .clone()
    }

    fn existing(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).cloned()
    }

    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        match self.existing(session_id) {
            Some(handle) => handle.lock().await.messages(),
            None => Vec::new(),
        }
    }

    pub async fn push(&self, session_id: &str, role: Role, content: impl Into<String>) {
        self.session(session_id).lock().await.push(role, content);
    }

    /// Clears the history. Unknown sessions are a no-op.
    pub async fn reset(&self, session_id: &str) {
        if let Some(handle) = self.existing(session_id) {
            handle.lock().await.clear();
        }
    }

    /// Drops a connection-scoped session entirely.
    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Client-supplied id, then the `x-conversation-id` header, then
/// `"{peer_ip}:{user-agent prefix}"`.
///
/// The fallback is shared by every client behind one address with the same
/// user agent.
pub fn resolve_session_id(body_id: Option<&str>, headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(id) = non_blank(body_id) {
        return id.to_string();
    }
    let header = headers
        .get(CONVERSATION_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Some(id) = non_blank(header) {
        return id.to_string();
    }

    let agent: String = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .chars()
        .take(USER_AGENT_PREFIX_CHARS)
        .collect();
    let ip = peer.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string());
    format!("{}:{}", ip, agent)
}
