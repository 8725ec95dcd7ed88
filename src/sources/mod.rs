//! Tabular data collaborators: where ingestion rows come from and where
//! answered queries are logged.

use async_trait::async_trait;

use crate::core::errors::RagError;

pub mod google_auth;
pub mod query_log;
pub mod sheets;

pub use google_auth::ServiceAccountAuth;
pub use query_log::{QueryLog, QueryLogEntry, SheetsQueryLog};
pub use sheets::SheetsRowSource;

/// One source record: header → cell value, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    cells: Vec<(String, String)>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = Self::new();
        for (key, value) in pairs {
            row.insert(key, value);
        }
        row
    }

    /// A repeated header keeps its first position and takes the latest value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[async_trait]
pub trait RowSource: Send + Sync {
    fn name(&self) -> &str;

    async fn load_rows(&self) -> Result<Vec<SourceRow>, RagError>;
}

/// Fixed in-memory rows, for seeding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRowSource {
    rows: Vec<SourceRow>,
}

impl StaticRowSource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl RowSource for StaticRowSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn load_rows(&self) -> Result<Vec<SourceRow>, RagError> {
        Ok(self.rows.clone())
    }
}
