//! Storage backends for chunk records and their embeddings.
//!
//! The [`VectorBackend`] trait abstracts over index implementations so the
//! merge path is not tied to a specific on-disk format:
//!
//! ```text
//!                  ┌────────────────────┐
//!                  │   VectorBackend    │
//!                  │ (append + search)  │
//!                  └─────────┬──────────┘
//!                            │
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!      ┌─────────────────┐        ┌───────────────┐
//!      │ FlatVectorStore │        │   (future)    │
//!      │ dir + index.json│        │ sqlite-vec /  │
//!      └─────────────────┘        │   pgvector    │
//!                                 └───────────────┘
//! ```
//!
//! The index is append-only: inserting never reads back, deduplicates, or
//! deletes existing entries, so re-ingesting the same content produces
//! duplicate records. That is the documented contract, not a defect.

pub mod flat;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::chunking::Chunk;
use crate::embeddings::EmbeddingProvider;
use crate::types::{ExtractMethod, IngestError};

pub use flat::FlatVectorStore;

/// A chunk with provenance and its embedding, as persisted in the index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Record id, assigned at insert time.
    pub id: String,
    pub content: String,
    /// URL the chunk's page was fetched from.
    pub source: String,
    pub extract_method: ExtractMethod,
    pub extract_pattern: String,
    pub block_index: usize,
    pub embedding: Vec<f32>,
}

impl StoredChunk {
    /// Pairs a chunk with its embedding under a fresh record id.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: chunk.content.clone(),
            source: chunk.source_url.clone(),
            extract_method: chunk.extract_method,
            extract_pattern: chunk.extract_pattern.clone(),
            block_index: chunk.block_index,
            embedding,
        }
    }
}

/// Unified interface over vector-index backends.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Appends records. Existing entries are never read back or deduplicated.
    async fn insert_chunks(&mut self, chunks: Vec<StoredChunk>) -> Result<(), IngestError>;

    /// Top-k records by cosine similarity, most similar first.
    async fn search_similar(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, IngestError>;

    /// Number of records currently held.
    async fn count(&self) -> Result<usize, IngestError>;

    /// Writes the index artifact to disk.
    async fn persist(&self) -> Result<(), IngestError>;
}

/// Embeds `chunks` and merges them into the index at `index_dir`.
///
/// The directory's presence is the sole signal: absent means create, present
/// means load and append. The updated index is persisted before returning.
/// Not transactional: a crash mid-merge can leave partial state on disk,
/// which is not rolled back.
pub async fn merge_into_index(
    index_dir: &Path,
    chunks: &[Chunk],
    provider: &dyn EmbeddingProvider,
) -> Result<(), IngestError> {
    let mut store = if index_dir.exists() {
        info!("loading existing index from {}", index_dir.display());
        FlatVectorStore::load(index_dir).await?
    } else {
        info!("creating new index at {}", index_dir.display());
        FlatVectorStore::create(index_dir)
    };

    let mut records = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let embedding = provider.embed(&chunk.content).await?;
        records.push(StoredChunk::from_chunk(chunk, embedding));
    }

    store.insert_chunks(records).await?;
    store.persist().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;

    fn chunk(content: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            source_url: "http://a.test/".to_string(),
            extract_method: ExtractMethod::Fallback,
            extract_pattern: "body".to_string(),
            block_index: 0,
        }
    }

    #[tokio::test]
    async fn merge_creates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let provider = MockEmbeddingProvider::new();

        let chunks = vec![chunk("alpha"), chunk("beta")];
        merge_into_index(&index_dir, &chunks, &provider).await.unwrap();

        let store = FlatVectorStore::load(&index_dir).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        // Second merge over the same content appends duplicates.
        merge_into_index(&index_dir, &chunks, &provider).await.unwrap();
        let store = FlatVectorStore::load(&index_dir).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn stored_records_preserve_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let provider = MockEmbeddingProvider::new();

        let chunks = vec![chunk("first"), chunk("second"), chunk("third")];
        merge_into_index(&index_dir, &chunks, &provider).await.unwrap();

        let store = FlatVectorStore::load(&index_dir).await.unwrap();
        let contents: Vec<&str> = store.records().iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }
}
