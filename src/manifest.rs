//! Provenance manifest generation.
//!
//! One entry per persisted chunk, keyed by the chunk's position in the final
//! sequence: the same sequence, in the same order, handed to the index
//! merger. The manifest is a side-channel; the index never reads it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::chunking::Chunk;
use crate::types::{ExtractMethod, IngestError};

pub const MANIFEST_FILE: &str = "manifest.json";

const SNIPPET_MAX_CHARS: usize = 200;

/// Provenance record for one persisted chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// 0-based position of the chunk in the final sequence.
    pub id: usize,
    /// URL the chunk's page was fetched from.
    pub source: String,
    pub extract_method: ExtractMethod,
    pub extract_pattern: String,
    /// Position of the parent block within its page's extraction result.
    pub block_index: usize,
    /// Leading content, truncated with an ellipsis past 200 characters.
    pub snippet: String,
}

/// Builds one entry per chunk, ids assigned positionally.
pub fn build_manifest(chunks: &[Chunk]) -> Vec<ManifestEntry> {
    chunks
        .iter()
        .enumerate()
        .map(|(id, chunk)| ManifestEntry {
            id,
            source: chunk.source_url.clone(),
            extract_method: chunk.extract_method,
            extract_pattern: chunk.extract_pattern.clone(),
            block_index: chunk.block_index,
            snippet: snippet(&chunk.content),
        })
        .collect()
}

/// Writes the run's manifest into `dir`, replacing any previous manifest.
pub async fn write_manifest(dir: &Path, entries: &[ManifestEntry]) -> Result<(), IngestError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|err| IngestError::Index(format!("cannot create {}: {err}", dir.display())))?;

    let path = dir.join(MANIFEST_FILE);
    let data = serde_json::to_string_pretty(entries)
        .map_err(|err| IngestError::Index(format!("cannot serialize manifest: {err}")))?;
    fs::write(&path, data)
        .await
        .map_err(|err| IngestError::Index(format!("cannot write {}: {err}", path.display())))?;
    Ok(())
}

/// Reads a previously written manifest from `dir`.
pub async fn read_manifest(dir: &Path) -> Result<Vec<ManifestEntry>, IngestError> {
    let path = dir.join(MANIFEST_FILE);
    let data = fs::read_to_string(&path)
        .await
        .map_err(|err| IngestError::Index(format!("cannot read {}: {err}", path.display())))?;
    serde_json::from_str(&data)
        .map_err(|err| IngestError::Index(format!("cannot parse {}: {err}", path.display())))
}

fn snippet(content: &str) -> String {
    if content.chars().count() <= SNIPPET_MAX_CHARS {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, source: &str, block_index: usize) -> Chunk {
        Chunk {
            content: content.to_string(),
            source_url: source.to_string(),
            extract_method: ExtractMethod::Tag,
            extract_pattern: "p".to_string(),
            block_index,
        }
    }

    #[test]
    fn ids_are_positional() {
        let chunks = vec![
            chunk("first", "http://a.test", 0),
            chunk("second", "http://a.test", 1),
            chunk("third", "http://b.test", 0),
        ];
        let entries = build_manifest(&chunks);

        assert_eq!(entries.len(), 3);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.id, i);
        }
        assert_eq!(entries[2].source, "http://b.test");
        assert_eq!(entries[2].block_index, 0);
    }

    #[test]
    fn long_snippets_are_truncated_with_ellipsis() {
        let long = "x".repeat(500);
        let entries = build_manifest(&[chunk(&long, "http://a.test", 0)]);

        let snippet = &entries[0].snippet;
        assert_eq!(snippet.chars().count(), 203);
        assert!(snippet.ends_with("..."));

        let short = build_manifest(&[chunk("short", "http://a.test", 0)]);
        assert_eq!(short[0].snippet, "short");
    }

    #[tokio::test]
    async fn manifest_roundtrips_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();

        let first = build_manifest(&[chunk("one", "http://a.test", 0)]);
        write_manifest(dir.path(), &first).await.unwrap();

        let second = build_manifest(&[
            chunk("two", "http://b.test", 0),
            chunk("three", "http://b.test", 1),
        ]);
        write_manifest(dir.path(), &second).await.unwrap();

        let read = read_manifest(dir.path()).await.unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].snippet, "two");
        assert_eq!(read[1].id, 1);
    }
}
