use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::fields::map_row;
use super::record::{EventMetadata, VectorRecord};
use super::store::VectorStore;
use crate::core::config::settings::IngestConfig;
use crate::core::errors::RagError;
use crate::llm::{Embedder, Segmenter};
use crate::sources::{RowSource, SourceRow};

/// Rebuilds the vector store from a row source.
///
/// Only one rebuild runs at a time. Queries never wait on it; they read
/// whichever generation is on disk.
pub struct Ingestor {
    source: Arc<dyn RowSource>,
    embedder: Arc<dyn Embedder>,
    segmenter: Arc<dyn Segmenter>,
    store: VectorStore,
    settings: IngestConfig,
    lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(
        source: Arc<dyn RowSource>,
        embedder: Arc<dyn Embedder>,
        segmenter: Arc<dyn Segmenter>,
        store: VectorStore,
        settings: IngestConfig,
    ) -> Self {
        Self {
            source,
            embedder,
            segmenter,
            store,
            settings,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Returns the number of records in the new generation.
    pub async fn rebuild(&self) -> Result<usize, RagError> {
        let _guard = self.lock.lock().await;

        tracing::info!("Loading rows from {}", self.source.name());
        let rows = self.source.load_rows().await?;
        tracing::info!("Building vectors for {} rows", rows.len());

        let records = self.embed_rows(&rows).await;
        if records.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        self.store.save(&records).await?;
        tracing::info!("Built {} vectors from {} rows", records.len(), rows.len());
        Ok(records.len())
    }

    /// Builds only when the store is missing or empty. Failures are logged.
    pub async fn warm_up(&self) {
        if !self.store.needs_build().await {
            tracing::info!("Vector store ready at {}", self.store.path().display());
            return;
        }
        tracing::info!("Vector store missing or empty; building before startup");
        if let Err(err) = self.rebuild().await {
            tracing::error!("Startup vector build failed: {}", err);
        }
    }

    async fn embed_rows(&self, rows: &[SourceRow]) -> Vec<VectorRecord> {
        let delay = Duration::from_millis(self.settings.row_delay_ms);
        let mut out: Vec<VectorRecord> = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let meta = map_row(row);
            if meta.base_text.chars().count() < self.settings.min_text_chars {
                tracing::debug!("[row {}] skipped: no usable text", index);
                continue;
            }

            match self.embed_row(index, &meta, out.len()).await {
                Ok(records) => {
                    out.extend(records);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => tracing::warn!("[row {}] {}", index, err),
            }
        }

        out
    }

    /// All segments of a row embed, or the row contributes nothing.
    async fn embed_row(
        &self,
        index: usize,
        meta: &EventMetadata,
        mut next_id: usize,
    ) -> Result<Vec<VectorRecord>, RagError> {
        let segments = if meta.base_text.chars().count() > self.settings.segment_threshold_chars {
            self.segmenter.segment(&meta.base_text).await?
        } else {
            vec![meta.base_text.clone()]
        };

        let mut records = Vec::with_capacity(segments.len());
        for segment in segments {
            if segment.trim().is_empty() {
                continue;
            }
            let embedding = self.embedder.embed(&segment).await?;
            records.push(VectorRecord::new(
                format!("{}-{}", index, next_id),
                meta.clone(),
                segment,
                embedding,
            ));
            next_id += 1;
        }
        Ok(records)
    }
}
