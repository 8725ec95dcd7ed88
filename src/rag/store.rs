//! Flat-file vector store.
//!
//! A store generation is the complete ordered record list produced by one
//! rebuild. It is published by writing `<path>.tmp` and renaming it over
//! `<path>`, so readers see either the previous generation or the new one.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::record::VectorRecord;
use crate::core::errors::RagError;

#[derive(Debug, Clone)]
pub struct VectorStore {
    path: PathBuf,
}

impl VectorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut raw = self.path.clone().into_os_string();
        raw.push(".tmp");
        PathBuf::from(raw)
    }

    pub async fn save(&self, records: &[VectorRecord]) -> Result<(), RagError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(records)?;
        let temp = self.temp_path();
        fs::write(&temp, body).await?;
        fs::rename(&temp, &self.path).await?;
        tracing::info!(
            "Vector store written: {} records -> {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Reads the whole generation. Unparseable or empty files count as empty.
    pub async fn load(&self) -> Result<Vec<VectorRecord>, RagError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(RagError::StoreNotFound(self.path.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        let records: Vec<VectorRecord> = match serde_json::from_slice(&raw) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!("Vector store {} unreadable: {}", self.path.display(), err);
                return Err(RagError::EmptyStore);
            }
        };
        if records.is_empty() {
            return Err(RagError::EmptyStore);
        }
        Ok(records)
    }

    /// True when the store is missing or holds no usable records.
    pub async fn needs_build(&self) -> bool {
        self.load().await.is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::record::EventMetadata;
    use tempfile::tempdir;

    fn sample() -> Vec<VectorRecord> {
        let meta = EventMetadata {
            title: "부산 국제 모터쇼".to_string(),
            venue: "BEXCO".to_string(),
            base_text: "부산 국제 모터쇼 / 장소:BEXCO".to_string(),
            ..EventMetadata::default()
        };
        vec![
            VectorRecord::new("0-0", meta.clone(), "부산 국제 모터쇼", vec![0.25, -0.5]),
            VectorRecord::new("2-1", meta, "BEXCO", vec![1.0, 0.0]),
        ]
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("nested").join("vectors.json"));

        store.save(&sample()).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, sample());
        assert!(!dir.path().join("nested").join("vectors.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_replaces_previous_generation() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("vectors.json"));

        store.save(&sample()).await.unwrap();
        store.save(&sample()[..1]).await.unwrap();

        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("vectors.json"));

        assert!(matches!(store.load().await, Err(RagError::StoreNotFound(_))));
        assert!(store.needs_build().await);
    }

    #[tokio::test]
    async fn empty_or_malformed_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.json");
        let store = VectorStore::new(&path);

        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(store.load().await, Err(RagError::EmptyStore)));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(store.load().await, Err(RagError::EmptyStore)));
    }
}
