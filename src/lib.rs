//! ```text
//! sources.json ──► sources::parse_sources ──► one SourceDescriptor per (source, url)
//!                                                      │
//!                                   pipeline::gather_documents (≤ C in flight)
//!                                     ├─► fetch::Fetcher ──► raw HTML
//!                                     └─► extract::extract_blocks (blocking pool)
//!                                                      │
//!              IngestedDocuments (completion order) ──► chunking::split_documents
//!                                                      │
//!                          ┌───────────────────────────┴───────────────┐
//!                          ▼                                           ▼
//!            stores::merge_into_index                      manifest::write_manifest
//!            (embed + append + persist)                    (positional provenance)
//! ```
//!
//! Per-task fetch and extraction failures are isolated and logged; the run
//! aborts only on a malformed source list, an all-empty result, an
//! interrupt, or an index/embedding failure.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod fetch;
pub mod manifest;
pub mod pipeline;
pub mod sources;
pub mod stores;
pub mod types;

pub use chunking::{Chunk, split_documents};
pub use config::Settings;
pub use embeddings::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
pub use extract::{ExtractedBlock, extract_blocks};
pub use fetch::{FetchMetrics, Fetcher};
pub use manifest::{ManifestEntry, build_manifest, read_manifest, write_manifest};
pub use pipeline::{GatherOutcome, IngestedDocument, RunSummary, gather_documents, run as run_ingestion};
pub use sources::{SourceDescriptor, load_sources, parse_sources};
pub use stores::{FlatVectorStore, StoredChunk, VectorBackend, merge_into_index};
pub use types::{CancelFlag, ExtractMethod, IngestError};
