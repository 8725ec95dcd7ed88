//! Shared fakes for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use crate::core::errors::RagError;
use crate::llm::{ChatCompletion, ChatMessage, ChatModel, ChatOptions, Embedder, Segmenter, TokenUsage};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_mock(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Embeds by keyword presence: one dimension per keyword.
pub struct KeywordEmbedder {
    pub keywords: Vec<&'static str>,
    pub fail_on: Option<&'static str>,
    pub calls: Mutex<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn new(keywords: Vec<&'static str>) -> Self {
        Self {
            keywords,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_on = Some(marker);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyInput);
        }
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(marker) = self.fail_on {
            if text.contains(marker) {
                return Err(RagError::upstream("embedding", "injected failure"));
            }
        }
        Ok(self
            .keywords
            .iter()
            .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
            .collect())
    }
}

/// Splits on `|` so tests control segment boundaries.
pub struct PipeSegmenter;

#[async_trait]
impl Segmenter for PipeSegmenter {
    async fn segment(&self, text: &str) -> Result<Vec<String>, RagError> {
        Ok(text.split('|').map(|s| s.to_string()).collect())
    }
}

/// Records every prompt and answers with a fixed text.
pub struct ScriptedChat {
    pub answer: String,
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Vec<ChatMessage> {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<ChatCompletion, RagError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        Ok(ChatCompletion {
            content: self.answer.clone(),
            tokens: TokenUsage {
                input: 10,
                output: 2,
                total: 12,
            },
        })
    }
}
