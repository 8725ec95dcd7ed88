use serde::{Deserialize, Serialize};

/// Canonical event fields pulled out of one source row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventMetadata {
    pub category: String,
    pub industry: String,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub venue: String,
    pub price: String,
    pub host: String,
    pub manage: String,
    pub inquiry: String,
    pub site: String,
    pub ticket: String,
    pub age: String,
    pub gender: String,
    pub interest: String,
    pub job: String,
    pub base_text: String,
}

/// One embedded segment of a source row, as persisted in the store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    #[serde(rename = "meta", alias = "metadata", default)]
    pub metadata: EventMetadata,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    pub fn new(
        id: impl Into<String>,
        metadata: EventMetadata,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            metadata,
            text: text.into(),
            embedding,
        }
    }
}
