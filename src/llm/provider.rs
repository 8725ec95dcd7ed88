use async_trait::async_trait;

use super::types::{ChatCompletion, ChatMessage, ChatOptions};
use crate::core::errors::RagError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text into a flat vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Split an overlong text into independently embeddable segments.
    async fn segment(&self, text: &str) -> Result<Vec<String>, RagError>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// chat completion (non-streaming)
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, RagError>;
}
