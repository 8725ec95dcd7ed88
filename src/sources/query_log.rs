use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::settings::QueryLogConfig;
use crate::core::config::settings::SheetsConfig;
use crate::core::errors::RagError;
use crate::llm::http::{snippet, with_bearer};
use crate::llm::TokenUsage;

const SERVICE: &str = "query-log";
const DEFAULT_RANGE: &str = "Sheet1!A1";

#[derive(Debug, Clone)]
pub struct QueryLogEntry {
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
    pub question: String,
    pub answer: String,
    pub hit_ids: Vec<String>,
    pub tokens: TokenUsage,
}

impl QueryLogEntry {
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            json!(self.timestamp.to_rfc3339()),
            json!(self.conversation_id),
            json!(self.question),
            json!(self.answer),
            json!(self.hit_ids.join(",")),
            json!(self.tokens.input),
            json!(self.tokens.output),
            json!(self.tokens.total),
        ]
    }
}

/// Append-only sink for answered queries.
#[async_trait]
pub trait QueryLog: Send + Sync {
    async fn record(&self, entry: &QueryLogEntry) -> Result<(), RagError>;
}

/// Appends each entry as a row through the Sheets `values:append` endpoint.
#[derive(Clone)]
pub struct SheetsQueryLog {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    access_token: Option<String>,
}

impl SheetsQueryLog {
    /// `None` when no log spreadsheet is configured.
    pub fn from_config(
        client: Client,
        sheets: &SheetsConfig,
        config: &QueryLogConfig,
    ) -> Option<Self> {
        if !config.is_enabled() {
            return None;
        }
        Some(Self {
            client,
            base_url: sheets.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone().unwrap_or_default(),
            range: config
                .range
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_RANGE.to_string()),
            access_token: config
                .access_token
                .clone()
                .or_else(|| sheets.access_token.clone()),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(&self.range)
        )
    }
}

#[async_trait]
impl QueryLog for SheetsQueryLog {
    async fn record(&self, entry: &QueryLogEntry) -> Result<(), RagError> {
        let request = self
            .client
            .post(self.endpoint())
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [entry.to_row()] }));
        let response = with_bearer(request, self.access_token.as_deref())
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
        Ok(())
    }
}
