use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::http::{as_count, request_id, snippet, with_bearer, REQUEST_ID_HEADER};
use super::provider::ChatModel;
use super::types::{ChatCompletion, ChatMessage, ChatOptions, TokenUsage};
use super::usage::UsageCounters;
use crate::core::errors::RagError;

const SERVICE: &str = "chat";

/// CLOVA Studio v3 chat-completions client (non-streaming).
#[derive(Clone)]
pub struct ClovaChatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    usage: Arc<UsageCounters>,
}

impl ClovaChatClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        usage: Arc<UsageCounters>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            usage,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/chat-completions/{}", self.base_url, self.model)
    }
}

pub fn build_request_body(messages: &[ChatMessage], options: &ChatOptions) -> Value {
    let wrapped: Vec<Value> = messages
        .iter()
        .map(|m| {
            json!({
                "role": m.role.as_str(),
                "content": [{ "type": "text", "text": m.content }],
            })
        })
        .collect();

    json!({
        "messages": wrapped,
        "temperature": options.temperature,
        "topP": options.top_p,
        "topK": options.top_k,
        "maxTokens": options.max_tokens,
        "repeatPenalty": options.repeat_penalty,
        "stop": options.stop,
    })
}

type AnswerExtractor = fn(&Value) -> Option<&str>;

fn content_parts_text(payload: &Value) -> Option<&str> {
    payload["result"]["message"]["content"][0]["text"].as_str()
}

fn content_string(payload: &Value) -> Option<&str> {
    payload["result"]["message"]["content"].as_str()
}

fn choices_content(payload: &Value) -> Option<&str> {
    payload["choices"][0]["message"]["content"].as_str()
}

const ANSWER_EXTRACTORS: &[AnswerExtractor] =
    &[content_parts_text, content_string, choices_content];

/// Answer text, or an empty string when no known field carries text.
pub fn extract_answer(payload: &Value) -> String {
    ANSWER_EXTRACTORS
        .iter()
        .find_map(|extract| extract(payload).filter(|text| !text.is_empty()))
        .unwrap_or_default()
        .to_string()
}

pub fn extract_usage(payload: &Value) -> TokenUsage {
    let usage = match &payload["result"]["usage"] {
        Value::Object(_) => &payload["result"]["usage"],
        _ => &payload["usage"],
    };
    let input = as_count(&usage["promptTokens"]).unwrap_or(0);
    let output = as_count(&usage["completionTokens"]).unwrap_or(0);
    let total = as_count(&usage["totalTokens"]).unwrap_or(input + output);
    TokenUsage {
        input,
        output,
        total,
    }
}

#[async_trait]
impl ChatModel for ClovaChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, RagError> {
        let body = build_request_body(messages, options);
        tracing::debug!("Chat request body: {}", body);

        let request = self
            .client
            .post(self.endpoint())
            .header(REQUEST_ID_HEADER, request_id("req"))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        let response = with_bearer(request, self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| RagError::upstream(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Upstream {
                service: SERVICE,
                status: Some(status.as_u16()),
                message: snippet(&text),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RagError::malformed(SERVICE, e.to_string()))?;

        let tokens = extract_usage(&payload);
        self.usage.record_chat(&tokens);
        tracing::debug!(
            "[chat] in={} out={} total={}",
            tokens.input,
            tokens.output,
            tokens.total
        );

        Ok(ChatCompletion {
            content: extract_answer(&payload),
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_mock;
    use axum::extract::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    #[test]
    fn messages_are_wrapped_as_text_parts() {
        let body = build_request_body(
            &[ChatMessage::system("sys"), ChatMessage::user("hi")],
            &ChatOptions::default(),
        );

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"][0]["type"], "text");
        assert_eq!(body["messages"][1]["content"][0]["text"], "hi");
        assert_eq!(body["maxTokens"], 700);
        assert_eq!(body["topP"], 0.8);
        assert_eq!(body["stop"], json!([]));
    }

    #[test]
    fn answer_extraction_tolerates_shape_variants() {
        assert_eq!(
            extract_answer(&json!({ "result": { "message": { "content": [{ "type": "text", "text": "A" }] } } })),
            "A"
        );
        assert_eq!(
            extract_answer(&json!({ "result": { "message": { "content": "B" } } })),
            "B"
        );
        assert_eq!(
            extract_answer(&json!({ "choices": [{ "message": { "content": "C" } }] })),
            "C"
        );
        assert_eq!(extract_answer(&json!({ "result": {} })), "");
    }

    #[test]
    fn usage_defaults_total_to_sum() {
        let usage = extract_usage(&json!({ "usage": { "promptTokens": 10, "completionTokens": 5 } }));
        assert_eq!(usage, TokenUsage { input: 10, output: 5, total: 15 });

        let nested = extract_usage(&json!({
            "result": { "usage": { "promptTokens": 1, "completionTokens": 2, "totalTokens": 4 } }
        }));
        assert_eq!(nested.total, 4);
    }

    #[tokio::test]
    async fn complete_returns_answer_and_counts_tokens() {
        let router = Router::new().route(
            "/testapp/v3/chat-completions/:model",
            post(|Json(body): Json<Value>| async move {
                let question = body["messages"][1]["content"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                Json(json!({
                    "status": { "code": "20000" },
                    "result": {
                        "message": { "role": "assistant", "content": format!("echo: {}", question) },
                        "usage": { "promptTokens": 12, "completionTokens": 3, "totalTokens": 15 }
                    }
                }))
            }),
        );
        let base = spawn_mock(router).await;
        let usage = Arc::new(UsageCounters::new());
        let client = ClovaChatClient::new(
            Client::new(),
            format!("{}/testapp", base),
            None,
            "HCX-005",
            usage.clone(),
        );

        let completion = client
            .complete(
                &[ChatMessage::system("sys"), ChatMessage::user("안녕")],
                &ChatOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(completion.content, "echo: 안녕");
        assert_eq!(completion.tokens.total, 15);
        assert_eq!(usage.snapshot().chat_calls, 1);
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let router = Router::new().route(
            "/v3/chat-completions/:model",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let base = spawn_mock(router).await;
        let client = ClovaChatClient::new(
            Client::new(),
            base,
            None,
            "HCX-005",
            Arc::new(UsageCounters::new()),
        );

        let err = client
            .complete(&[ChatMessage::user("q")], &ChatOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Upstream { status: Some(429), .. }));
        assert!(err.to_string().contains("rate limited"));
    }
}
