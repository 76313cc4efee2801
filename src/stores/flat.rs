//! Directory-backed flat vector index.
//!
//! The artifact is a directory holding `index.json`, a JSON list of
//! [`StoredChunk`] records. Loading reads the whole file into memory;
//! persisting rewrites it. No atomicity is assumed: a crash during persist
//! can leave a truncated file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{StoredChunk, VectorBackend};
use crate::types::IngestError;

pub const INDEX_FILE: &str = "index.json";

/// In-memory view of the on-disk index.
#[derive(Debug)]
pub struct FlatVectorStore {
    dir: PathBuf,
    records: Vec<StoredChunk>,
}

impl FlatVectorStore {
    /// Opens a fresh, empty index rooted at `dir`. Nothing touches the disk
    /// until [`persist`](VectorBackend::persist).
    pub fn create(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            records: Vec::new(),
        }
    }

    /// Loads an existing index from `dir`.
    ///
    /// A missing or unreadable `index.json` is an error; directory presence
    /// alone selects the load path, it does not imply a silent re-create.
    pub async fn load(dir: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let dir = dir.into();
        let path = dir.join(INDEX_FILE);
        let data = fs::read_to_string(&path)
            .await
            .map_err(|err| IngestError::Index(format!("cannot read {}: {err}", path.display())))?;
        let records: Vec<StoredChunk> = serde_json::from_str(&data)
            .map_err(|err| IngestError::Index(format!("cannot parse {}: {err}", path.display())))?;

        Ok(Self { dir, records })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn records(&self) -> &[StoredChunk] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VectorBackend for FlatVectorStore {
    async fn insert_chunks(&mut self, mut chunks: Vec<StoredChunk>) -> Result<(), IngestError> {
        self.records.append(&mut chunks);
        Ok(())
    }

    async fn search_similar(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, IngestError> {
        let mut scored: Vec<(StoredChunk, f32)> = self
            .records
            .iter()
            .map(|record| (record.clone(), cosine_similarity(query, &record.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, IngestError> {
        Ok(self.records.len())
    }

    async fn persist(&self) -> Result<(), IngestError> {
        fs::create_dir_all(&self.dir).await.map_err(|err| {
            IngestError::Index(format!("cannot create {}: {err}", self.dir.display()))
        })?;

        let path = self.dir.join(INDEX_FILE);
        let data = serde_json::to_string(&self.records)
            .map_err(|err| IngestError::Index(format!("cannot serialize index: {err}")))?;
        fs::write(&path, data)
            .await
            .map_err(|err| IngestError::Index(format!("cannot write {}: {err}", path.display())))?;
        Ok(())
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtractMethod;

    fn record(content: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            source: "http://a.test/".to_string(),
            extract_method: ExtractMethod::Tag,
            extract_pattern: "p".to_string(),
            block_index: 0,
            embedding,
        }
    }

    #[tokio::test]
    async fn persist_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");

        let mut store = FlatVectorStore::create(&index_dir);
        store
            .insert_chunks(vec![record("hello", vec![1.0, 0.0])])
            .await
            .unwrap();
        store.persist().await.unwrap();

        let loaded = FlatVectorStore::load(&index_dir).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.records()[0].content, "hello");
        assert_eq!(loaded.records()[0].embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn load_fails_when_index_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlatVectorStore::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, IngestError::Index(_)));
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let mut store = FlatVectorStore::create("unused");
        store
            .insert_chunks(vec![
                record("east", vec![1.0, 0.0]),
                record("north", vec![0.0, 1.0]),
                record("northeast", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = store.search_similar(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.content, "east");
        assert_eq!(hits[1].0.content, "northeast");
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        let same = cosine_similarity(&[0.5, 0.5], &[0.5, 0.5]);
        assert!((same - 1.0).abs() < 1e-6);
    }
}
