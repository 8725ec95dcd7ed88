use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::http::{request_id, snippet, with_bearer, REQUEST_ID_HEADER};
use super::provider::Segmenter;
use crate::core::errors::RagError;

const SERVICE: &str = "segmentation";

#[derive(Clone)]
pub struct ClovaSegmentationClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ClovaSegmentationClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/api-tools/segmentation", self.base_url)
    }
}

/// Segments may arrive as strings or as arrays of sentences.
pub fn parse_segments(payload: &Value, original: &str) -> Vec<String> {
    let list = payload["segments"]
        .as_array()
        .or_else(|| payload["result"]["segments"].as_array());
    let Some(list) = list else {
        return vec![original.to_string()];
    };

    list.iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text.clone()),
            Value::Array(sentences) => Some(
                sentences
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl Segmenter for ClovaSegmentationClient {
    async fn segment(&self, text: &str) -> Result<Vec<String>, RagError> {
        let body = json!({
            "text": text,
            "alpha": -100,
            "segCnt": -1,
            "postProcess": true,
            "postProcessMaxSize": 1000,
            "postProcessMinSize": 300,
        });

        let request = self
            .client
            .post(self.endpoint())
            .header(REQUEST_ID_HEADER, request_id("seg"))
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
        Ok(parse_segments(&payload, text))
    }
}
