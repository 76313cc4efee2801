//! Shared types: the crate error taxonomy, extraction provenance tags, and
//! the cooperative cancellation flag.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Errors surfaced by the ingestion pipeline and its collaborators.
///
/// Task-scoped failures ([`Fetch`](Self::Fetch), [`Extract`](Self::Extract))
/// are caught at the task boundary, logged, and cost only that task's
/// contribution. Everything else aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The source list could not be read or is not a JSON list of objects.
    #[error("failed to load source list: {0}")]
    SourceLoad(String),

    /// A page request failed: connection error, timeout, or non-success status.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Extraction rules could not be applied to a fetched page.
    #[error("extraction failed for {url}: {message}")]
    Extract { url: String, message: String },

    /// Every task failed or produced nothing; the index is left untouched.
    #[error("no documents were extracted from any source")]
    EmptyResult,

    /// The run was cancelled before the index merge; nothing was persisted.
    #[error("run interrupted before index merge")]
    Interrupted,

    /// Embedding collaborator unreachable, or the index could not be
    /// loaded/persisted. Partial on-disk state is possible and not rolled back.
    #[error("index error: {0}")]
    Index(String),

    /// A chat completion request failed or returned no usable answer.
    #[error("chat completion failed: {0}")]
    Chat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// How a text block was pulled out of its page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMethod {
    /// Matched one of the descriptor's tag-name rules.
    Tag,
    /// Matched one of the descriptor's CSS selector rules.
    Selector,
    /// Whole-page body text, emitted only when no rule matched.
    Fallback,
}

impl fmt::Display for ExtractMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::Selector => write!(f, "selector"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Cooperative cancellation flag shared between a signal handler and the run.
///
/// Once set, no new fetches are issued; in-flight work drains and the run
/// exits without merging, so the manifest never disagrees with the index.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
