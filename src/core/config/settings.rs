use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::defaults;

/// Typed view over the merged YAML + secrets + environment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub retrieval: RetrievalConfig,
    pub conversation: ConversationConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub prompt: PromptConfig,
    pub sheets: SheetsConfig,
    pub query_log: QueryLogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// CLOVA Studio application scope, `testapp` or `serviceapp`.
    pub app_id: String,
    pub upstream_timeout_secs: Option<u64>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            app_id: defaults::APP_ID.to_string(),
            upstream_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty or containing `"*"` mirrors any request origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::CLOVA_BASE_URL.to_string(),
            api_key: None,
            model: defaults::EMBED_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: i64,
    pub max_tokens: u32,
    pub repeat_penalty: f64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::CLOVA_BASE_URL.to_string(),
            api_key: None,
            model: defaults::CHAT_MODEL.to_string(),
            temperature: 0.3,
            top_p: 0.8,
            top_k: 0,
            max_tokens: 700,
            repeat_penalty: 1.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: defaults::TOP_K,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_history: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: defaults::MAX_HISTORY,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Defaults to `<data_dir>/vectors.json`.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub row_delay_ms: u64,
    pub min_text_chars: usize,
    pub segment_threshold_chars: usize,
    pub build_on_startup: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            row_delay_ms: 250,
            min_text_chars: 2,
            segment_threshold_chars: 2000,
            build_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: Option<String>,
    pub system_prompt_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub base_url: String,
    pub spreadsheet_id: Option<String>,
    pub range: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    /// Service-account credentials; take precedence over `access_token`.
    pub service_account_email: Option<String>,
    /// PEM-encoded RSA key of the service account.
    pub private_key: Option<String>,
    pub token_url: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SHEETS_BASE_URL.to_string(),
            spreadsheet_id: None,
            range: None,
            api_key: None,
            access_token: None,
            service_account_email: None,
            private_key: None,
            token_url: defaults::GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLogConfig {
    pub spreadsheet_id: Option<String>,
    pub range: Option<String>,
    pub access_token: Option<String>,
}

impl QueryLogConfig {
    pub fn is_enabled(&self) -> bool {
        self.spreadsheet_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

impl AppConfig {
    /// Embedding and segmentation share this base.
    pub fn embed_base(&self) -> String {
        let base = self
            .embedding
            .base_url
            .replace(defaults::CLOVA_STREAM_HOST, defaults::CLOVA_GATEWAY_HOST);
        with_app_scope(&base, &self.app.app_id)
    }

    pub fn chat_base(&self) -> String {
        with_app_scope(&self.chat.base_url, &self.app.app_id)
    }
}

fn app_scope_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/(testapp|serviceapp)(/|$)").expect("app scope pattern is valid")
    })
}

/// Appends `/{app_id}` unless the URL already carries an app scope segment.
pub fn with_app_scope(base: &str, app_id: &str) -> String {
    if app_scope_pattern().is_match(base) {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), app_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_scope_is_appended_once() {
        assert_eq!(
            with_app_scope("https://clovastudio.apigw.ntruss.com/", "testapp"),
            "https://clovastudio.apigw.ntruss.com/testapp"
        );
        assert_eq!(
            with_app_scope("https://clovastudio.apigw.ntruss.com/serviceapp", "testapp"),
            "https://clovastudio.apigw.ntruss.com/serviceapp"
        );
    }

    #[test]
    fn embed_base_swaps_stream_host() {
        let mut config = AppConfig::default();
        config.embedding.base_url = "https://clovastudio.stream.ntruss.com".to_string();
        assert_eq!(config.embed_base(), "https://clovastudio.apigw.ntruss.com/testapp");
        config.chat.base_url = "https://clovastudio.stream.ntruss.com".to_string();
        assert_eq!(config.chat_base(), "https://clovastudio.stream.ntruss.com/testapp");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_value(serde_json::json!({ "retrieval": { "top_k": 5 } })).unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.conversation.max_history, 20);
        assert_eq!(config.chat.max_tokens, 700);
        assert_eq!(config.embedding.model, "clir-emb-dolphin");
        assert!(!config.query_log.is_enabled());
    }
}
