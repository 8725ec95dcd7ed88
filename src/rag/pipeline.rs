use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::prompt::assemble;
use super::ranker::{rank, HitView};
use super::store::VectorStore;
use crate::core::errors::RagError;
use crate::history::ConversationStore;
use crate::llm::{ChatModel, ChatOptions, Embedder, Role, TokenUsage, UsageCounters};
use crate::sources::{QueryLog, QueryLogEntry};

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub question: String,
    pub session_id: String,
    /// Overrides the default system instruction when non-blank.
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub answer: String,
    pub hits: Vec<HitView>,
    pub conversation_id: String,
    pub tokens: TokenUsage,
}

/// Question → embed → rank → assemble → chat → remember.
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    store: VectorStore,
    conversations: Arc<ConversationStore>,
    usage: Arc<UsageCounters>,
    options: ChatOptions,
    top_k: usize,
    default_system_prompt: String,
    query_log: Option<Arc<dyn QueryLog>>,
}

impl QueryPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        store: VectorStore,
        conversations: Arc<ConversationStore>,
        usage: Arc<UsageCounters>,
        options: ChatOptions,
        top_k: usize,
        default_system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            chat,
            store,
            conversations,
            usage,
            options,
            top_k,
            default_system_prompt: default_system_prompt.into(),
            query_log: None,
        }
    }

    pub fn with_query_log(mut self, query_log: Option<Arc<dyn QueryLog>>) -> Self {
        self.query_log = query_log;
        self
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn default_system_prompt(&self) -> &str {
        &self.default_system_prompt
    }

    pub async fn answer(&self, request: QueryRequest) -> Result<QueryOutcome, RagError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question required".to_string()));
        }

        let corpus = self.store.load().await?;
        let system_prompt = request
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_system_prompt);

        let session = self.conversations.session(&request.session_id);
        let mut history = session.lock().await;

        let query_vector = self.embedder.embed(question).await?;
        let hits = rank(&query_vector, &corpus, self.top_k);
        let messages = assemble(system_prompt, &history.messages(), question, &hits);

        let completion = self.chat.complete(&messages, &self.options).await?;
        history.push(Role::User, question);
        history.push(Role::Assistant, completion.content.clone());
        drop(history);

        let outcome = QueryOutcome {
            answer: completion.content,
            hits: hits.iter().map(HitView::from).collect(),
            conversation_id: request.session_id,
            tokens: completion.tokens,
        };

        self.record(question, &outcome).await;
        self.usage.log_summary("after query");
        Ok(outcome)
    }

    async fn record(&self, question: &str, outcome: &QueryOutcome) {
        let Some(query_log) = &self.query_log else {
            return;
        };
        let entry = QueryLogEntry {
            timestamp: Utc::now(),
            conversation_id: outcome.conversation_id.clone(),
            question: question.to_string(),
            answer: outcome.answer.clone(),
            hit_ids: outcome.hits.iter().map(|hit| hit.id.clone()).collect(),
            tokens: outcome.tokens,
        };
        if let Err(err) = query_log.record(&entry).await {
            tracing::warn!("Failed to append query log row: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::record::{EventMetadata, VectorRecord};
    use crate::test_support::{KeywordEmbedder, ScriptedChat};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    struct MemoryLog(Mutex<Vec<QueryLogEntry>>);

    #[async_trait]
    impl QueryLog for MemoryLog {
        async fn record(&self, entry: &QueryLogEntry) -> Result<(), RagError> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        pipeline: QueryPipeline,
        chat: Arc<ScriptedChat>,
    }

    async fn fixture(seed: bool) -> Fixture {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("vectors.json"));
        if seed {
            let record = |id: &str, title: &str, embedding: Vec<f32>| {
                let meta = EventMetadata {
                    title: title.to_string(),
                    ..EventMetadata::default()
                };
                VectorRecord::new(id, meta, title, embedding)
            };
            store
                .save(&[
                    record("0-0", "재즈 페스티벌", vec![1.0, 0.0]),
                    record("1-1", "게임 쇼", vec![0.0, 1.0]),
                    record("2-2", "재즈 게임 나이트", vec![0.7, 0.7]),
                ])
                .await
                .unwrap();
        }

        let chat = Arc::new(ScriptedChat::new("재즈 페스티벌을 추천합니다."));
        let pipeline = QueryPipeline::new(
            Arc::new(KeywordEmbedder::new(vec!["재즈", "게임"])),
            chat.clone(),
            store,
            Arc::new(ConversationStore::new(20)),
            Arc::new(UsageCounters::new()),
            ChatOptions::default(),
            2,
            "기본 시스템",
        );
        Fixture {
            _dir: dir,
            pipeline,
            chat,
        }
    }

    fn request(question: &str, system_prompt: Option<&str>) -> QueryRequest {
        QueryRequest {
            question: question.to_string(),
            session_id: "cid-1".to_string(),
            system_prompt: system_prompt.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn answers_with_ranked_hits_and_remembers_turns() {
        let fx = fixture(true).await;

        let outcome = fx.pipeline.answer(request("  재즈 공연  ", None)).await.unwrap();

        assert_eq!(outcome.answer, "재즈 페스티벌을 추천합니다.");
        assert_eq!(outcome.conversation_id, "cid-1");
        assert_eq!(outcome.tokens.total, 12);
        let ids: Vec<&str> = outcome.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["0-0", "2-2"]);

        let prompt = fx.chat.last_prompt();
        assert_eq!(prompt[0].content, "기본 시스템");
        assert!(prompt[1].content.starts_with("질문: 재즈 공연\n"));

        let history = fx.pipeline.conversations().history("cid-1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "재즈 공연");
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn second_query_carries_history_and_prompt_override() {
        let fx = fixture(true).await;
        fx.pipeline.answer(request("재즈", None)).await.unwrap();

        fx.pipeline.answer(request("게임", Some(" 짧게 답하세요 "))).await.unwrap();

        let prompt = fx.chat.last_prompt();
        assert_eq!(prompt.len(), 4);
        assert_eq!(prompt[0].content, "짧게 답하세요");
        assert_eq!(prompt[1].content, "재즈");
    }

    #[tokio::test]
    async fn blank_question_is_invalid_input() {
        let fx = fixture(true).await;
        let err = fx.pipeline.answer(request("   ", None)).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_store_is_precondition_error() {
        let fx = fixture(false).await;
        let err = fx.pipeline.answer(request("재즈", None)).await.unwrap_err();
        assert!(err.is_precondition());
        assert!(fx.chat.last_prompt().is_empty());
    }

    #[tokio::test]
    async fn answered_queries_are_logged() {
        let fx = fixture(true).await;
        let log = Arc::new(MemoryLog(Mutex::new(Vec::new())));
        let pipeline = fx.pipeline.with_query_log(Some(log.clone() as Arc<dyn QueryLog>));

        pipeline.answer(request("게임", None)).await.unwrap();

        let entries = log.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hit_ids[0], "1-1");
        assert_eq!(entries[0].question, "게임");
    }
}
