use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::google_auth::ServiceAccountAuth;
use super::{RowSource, SourceRow};
use crate::core::config::settings::SheetsConfig;
use crate::core::errors::RagError;
use crate::llm::http::{snippet, with_bearer};

const SERVICE: &str = "sheets";

/// Reads one range of a Google spreadsheet; the first row is the header.
///
/// Authenticates with a service account when one is attached, otherwise
/// with the static access token and/or API key.
#[derive(Clone)]
pub struct SheetsRowSource {
    client: Client,
    base_url: String,
    spreadsheet_id: Option<String>,
    range: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    service_account: Option<Arc<ServiceAccountAuth>>,
}

impl SheetsRowSource {
    pub fn new(client: Client, config: &SheetsConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone().filter(|s| !s.is_empty()),
            range: config.range.clone().filter(|s| !s.is_empty()),
            api_key: config.api_key.clone().filter(|s| !s.is_empty()),
            access_token: config.access_token.clone().filter(|s| !s.is_empty()),
            service_account: None,
        }
    }

    pub fn with_service_account(mut self, auth: Arc<ServiceAccountAuth>) -> Self {
        self.service_account = Some(auth);
        self
    }

    async fn bearer_token(&self) -> Result<Option<String>, RagError> {
        match &self.service_account {
            Some(auth) => auth.access_token().await.map(Some),
            None => Ok(self.access_token.clone()),
        }
    }

    fn endpoint(&self) -> Result<String, RagError> {
        let (Some(id), Some(range)) = (&self.spreadsheet_id, &self.range) else {
            return Err(RagError::Config(
                "Google Sheets spreadsheet id and range are not configured".to_string(),
            ));
        };
        Ok(format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(id),
            urlencoding::encode(range)
        ))
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Turns a `values` grid into rows keyed by the trimmed header row.
pub fn rows_from_values(values: &[Value]) -> Vec<SourceRow> {
    let Some((header, body)) = values.split_first() else {
        return Vec::new();
    };
    let headers: Vec<String> = header
        .as_array()
        .map(|cells| cells.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();

    body.iter()
        .map(|line| {
            let cells = line.as_array().map(Vec::as_slice).unwrap_or_default();
            SourceRow::from_pairs(headers.iter().enumerate().map(|(index, name)| {
                let value = cells.get(index).map(cell_text).unwrap_or_default();
                (name.clone(), value)
            }))
        })
        .collect()
}

#[async_trait]
impl RowSource for SheetsRowSource {
    fn name(&self) -> &str {
        "google-sheets"
    }

    async fn load_rows(&self) -> Result<Vec<SourceRow>, RagError> {
        let mut request = self.client.get(self.endpoint()?);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        let token = self.bearer_token().await?;
        let response = with_bearer(request, token.as_deref())
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
        let values = payload["values"].as_array().map(Vec::as_slice).unwrap_or_default();
        if values.is_empty() {
            tracing::info!("No data found in Google Sheet");
            return Ok(Vec::new());
        }

        let rows = rows_from_values(values);
        tracing::info!("[sheets] loaded {} rows", rows.len());
        Ok(rows)
    }
}
