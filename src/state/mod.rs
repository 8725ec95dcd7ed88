use std::sync::Arc;
use std::time::Duration;

use crate::core::config::defaults::FALLBACK_SYSTEM_PROMPT;
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::history::ConversationStore;
use crate::llm::http::build_client;
use crate::llm::{
    ChatModel, ChatOptions, ClovaChatClient, ClovaEmbeddingClient, ClovaSegmentationClient,
    Embedder, Segmenter, UsageCounters,
};
use crate::rag::{Ingestor, QueryPipeline, VectorStore};
use crate::sources::{QueryLog, RowSource, ServiceAccountAuth, SheetsQueryLog, SheetsRowSource};

pub mod error;

use error::InitializationError;

/// Remote collaborators the pipelines are wired to.
pub struct Collaborators {
    pub embedder: Arc<dyn Embedder>,
    pub segmenter: Arc<dyn Segmenter>,
    pub chat: Arc<dyn ChatModel>,
    pub rows: Arc<dyn RowSource>,
    pub query_log: Option<Arc<dyn QueryLog>>,
}

/// Application state shared across all routes and socket tasks.
///
/// Contains:
/// - Configuration and paths
/// - Process-wide token counters
/// - The ingestion pipeline (row source, segmenter, embedder, store)
/// - The query pipeline and the conversation store it owns
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppConfig>,
    pub usage: Arc<UsageCounters>,
    pub ingestor: Arc<Ingestor>,
    pub query: Arc<QueryPipeline>,
    pub conversations: Arc<ConversationStore>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Loads configuration (YAML, secrets, environment)
    /// 2. Builds the CLOVA Studio and Google Sheets clients
    /// 3. Wires the ingestion and query pipelines over one vector store
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let timeout = settings.app.upstream_timeout_secs.map(Duration::from_secs);
        let client = build_client(timeout).map_err(|e| InitializationError::HttpClient(e.into()))?;
        let usage = Arc::new(UsageCounters::new());

        let mut rows = SheetsRowSource::new(client.clone(), &settings.sheets);
        if let Some(auth) = ServiceAccountAuth::from_config(client.clone(), &settings.sheets)
            .map_err(|e| InitializationError::Config(e.into()))?
        {
            tracing::info!("Google Sheets authenticates as {}", auth.email());
            rows = rows.with_service_account(Arc::new(auth));
        }

        let embed_base = settings.embed_base();
        let collaborators = Collaborators {
            embedder: Arc::new(ClovaEmbeddingClient::new(
                client.clone(),
                embed_base.clone(),
                settings.embedding.api_key.clone(),
                settings.embedding.model.clone(),
                usage.clone(),
            )),
            segmenter: Arc::new(ClovaSegmentationClient::new(
                client.clone(),
                embed_base,
                settings.embedding.api_key.clone(),
            )),
            chat: Arc::new(ClovaChatClient::new(
                client.clone(),
                settings.chat_base(),
                settings.chat.api_key.clone(),
                settings.chat.model.clone(),
                usage.clone(),
            )),
            rows: Arc::new(rows),
            query_log: SheetsQueryLog::from_config(client, &settings.sheets, &settings.query_log)
                .map(|log| Arc::new(log) as Arc<dyn QueryLog>),
        };

        tracing::info!(
            "Embedding base {} (model {}), chat base {} (model {})",
            settings.embed_base(),
            settings.embedding.model,
            settings.chat_base(),
            settings.chat.model
        );

        Ok(Arc::new(Self::from_parts(
            paths,
            config,
            settings,
            usage,
            collaborators,
        )))
    }

    /// Wires state from explicit parts.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppConfig,
        usage: Arc<UsageCounters>,
        collaborators: Collaborators,
    ) -> Self {
        let store_path = settings
            .store
            .path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| paths.resolve(p))
            .unwrap_or_else(|| paths.default_store_path());
        let store = VectorStore::new(store_path);
        let conversations = Arc::new(ConversationStore::new(settings.conversation.max_history));

        let ingestor = Arc::new(Ingestor::new(
            collaborators.rows,
            collaborators.embedder.clone(),
            collaborators.segmenter,
            store.clone(),
            settings.ingest.clone(),
        ));

        let system_prompt = load_system_prompt(&paths, &settings);
        let query = Arc::new(
            QueryPipeline::new(
                collaborators.embedder,
                collaborators.chat,
                store,
                conversations.clone(),
                usage.clone(),
                ChatOptions::from_config(&settings.chat),
                settings.retrieval.top_k,
                system_prompt,
            )
            .with_query_log(collaborators.query_log),
        );

        Self {
            paths,
            config,
            settings: Arc::new(settings),
            usage,
            ingestor,
            query,
            conversations,
        }
    }
}

/// Inline prompt, then the prompt file, then the built-in instruction.
fn load_system_prompt(paths: &AppPaths, settings: &AppConfig) -> String {
    if let Some(inline) = settings
        .prompt
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        return inline.to_string();
    }

    let path = paths.resolve(
        settings
            .prompt
            .system_prompt_path
            .as_deref()
            .unwrap_or(crate::core::config::defaults::SYSTEM_PROMPT_PATH),
    );
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!("System prompt loaded from {}", path.display());
            text.trim().to_string()
        }
        Ok(_) => {
            tracing::warn!("System prompt file {} is empty; using fallback", path.display());
            FALLBACK_SYSTEM_PROMPT.to_string()
        }
        Err(err) => {
            tracing::warn!(
                "System prompt file {} unreadable ({}); using fallback",
                path.display(),
                err
            );
            FALLBACK_SYSTEM_PROMPT.to_string()
        }
    }
}
