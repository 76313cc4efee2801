//! Fixed-size overlapping window chunking.

use crate::pipeline::IngestedDocument;
use crate::types::ExtractMethod;

/// A bounded slice of one document's content, the unit stored in the index.
///
/// Carries all of its parent document's provenance; its position in the
/// final chunk sequence becomes the manifest id downstream.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub source_url: String,
    pub extract_method: ExtractMethod,
    pub extract_pattern: String,
    pub block_index: usize,
}

/// Splits every document into overlapping character windows.
///
/// Documents are processed in the order given, and all chunks of document
/// `i` precede all chunks of document `i + 1`.
pub fn split_documents(
    documents: &[IngestedDocument],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for document in documents {
        for window in split_text(&document.content, chunk_size, chunk_overlap) {
            chunks.push(Chunk {
                content: window,
                source_url: document.source_url.clone(),
                extract_method: document.extract_method,
                extract_pattern: document.extract_pattern.clone(),
                block_index: document.block_index,
            });
        }
    }
    chunks
}

/// Overlapping windows over `text`, measured in characters.
///
/// Consecutive windows share `chunk_overlap` characters; an overlap at or
/// above the window size degenerates to a step of one character.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let size = chunk_size.max(1);
    let step = size.saturating_sub(chunk_overlap).max(1);
    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= size {
        return vec![text.to_string()];
    }

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    windows
}
