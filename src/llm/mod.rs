pub mod chat;
pub mod embedding;
pub mod http;
pub mod provider;
pub mod segmentation;
pub mod types;
pub mod usage;

pub use chat::ClovaChatClient;
pub use embedding::ClovaEmbeddingClient;
pub use provider::{ChatModel, Embedder, Segmenter};
pub use segmentation::ClovaSegmentationClient;
pub use types::{ChatCompletion, ChatMessage, ChatOptions, Role, TokenUsage};
pub use usage::{UsageCounters, UsageSnapshot};
