//! Pipeline coordination: fan tasks out to fetch + extract, fan results in.
//!
//! One task per normalized descriptor. Each task fetches under the bounded
//! fetcher, hands the raw page to the blocking pool for extraction, and
//! wraps the blocks into [`IngestedDocument`]s. A failing task is logged and
//! contributes zero documents; results are collected in completion order,
//! which is fetch-latency dependent and not reproducible across runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::chunking;
use crate::config::Settings;
use crate::embeddings::EmbeddingProvider;
use crate::extract;
use crate::fetch::Fetcher;
use crate::manifest;
use crate::sources::SourceDescriptor;
use crate::stores;
use crate::types::{CancelFlag, ExtractMethod, IngestError};

/// One extracted block paired with its page's provenance.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestedDocument {
    pub content: String,
    pub source_url: String,
    pub extract_method: ExtractMethod,
    pub extract_pattern: String,
    /// 0-based position of the block within its own page's extraction
    /// result, stable regardless of task completion order.
    pub block_index: usize,
}

/// Documents gathered by one pipeline pass plus its failure counts.
#[derive(Debug, Default)]
pub struct GatherOutcome {
    /// Concatenation, in task completion order, of each task's documents.
    pub documents: Vec<IngestedDocument>,
    pub fetch_errors: usize,
    pub extract_errors: usize,
}

/// Totals reported after a completed ingestion run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub sources: usize,
    pub pages_fetched: usize,
    pub fetch_errors: usize,
    pub extract_errors: usize,
    pub documents: usize,
    pub chunks: usize,
    pub peak_in_flight: usize,
}

/// Fetches and extracts every descriptor, collecting documents as tasks
/// finish.
pub async fn gather_documents(
    descriptors: Vec<SourceDescriptor>,
    fetcher: Arc<Fetcher>,
    politeness_delay: Duration,
    cancel: CancelFlag,
) -> GatherOutcome {
    let mut tasks = JoinSet::new();
    for descriptor in descriptors {
        let fetcher = Arc::clone(&fetcher);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            process_source(descriptor, fetcher, politeness_delay, cancel).await
        });
    }

    let mut outcome = GatherOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(mut documents)) => outcome.documents.append(&mut documents),
            Ok(Err(IngestError::Interrupted)) => {}
            Ok(Err(err @ IngestError::Fetch { .. })) => {
                outcome.fetch_errors += 1;
                warn!("{err}");
            }
            Ok(Err(err @ IngestError::Extract { .. })) => {
                outcome.extract_errors += 1;
                warn!("{err}");
            }
            Ok(Err(err)) => warn!("{err}"),
            Err(err) => warn!("ingest task panicked: {err}"),
        }
    }
    outcome
}

/// Drives fetch → extract → wrap for a single descriptor.
async fn process_source(
    descriptor: SourceDescriptor,
    fetcher: Arc<Fetcher>,
    politeness_delay: Duration,
    cancel: CancelFlag,
) -> Result<Vec<IngestedDocument>, IngestError> {
    if cancel.is_cancelled() {
        return Err(IngestError::Interrupted);
    }

    let url = descriptor.url.clone();
    let raw = fetcher.fetch(&url).await?;

    // The concurrency slot is free again; parsing moves to the blocking
    // pool so it never delays scheduling of other fetches.
    let blocks = tokio::task::spawn_blocking(move || extract::extract_blocks(&raw, &descriptor))
        .await
        .map_err(|err| IngestError::Extract {
            url: url.clone(),
            message: format!("extraction task failed: {err}"),
        })??;

    let documents = blocks
        .into_iter()
        .enumerate()
        .map(|(block_index, block)| IngestedDocument {
            content: block.text,
            source_url: url.clone(),
            extract_method: block.method,
            extract_pattern: block.pattern,
            block_index,
        })
        .collect();

    if !politeness_delay.is_zero() {
        tokio::time::sleep(politeness_delay).await;
    }

    Ok(documents)
}

/// Runs the whole ingestion: gather, chunk, merge, manifest.
///
/// The index and manifest are written exactly once, after all concurrent
/// work has finished, by this single writer. A cancelled run returns
/// [`IngestError::Interrupted`] before touching either file; a run in which
/// no task produced documents returns [`IngestError::EmptyResult`].
pub async fn run(
    descriptors: Vec<SourceDescriptor>,
    settings: &Settings,
    provider: &dyn EmbeddingProvider,
    cancel: CancelFlag,
) -> Result<RunSummary, IngestError> {
    let sources = descriptors.len();
    info!(
        sources,
        concurrency = settings.concurrency,
        "starting ingestion run"
    );

    let fetcher = Arc::new(Fetcher::new(
        settings.concurrency,
        settings.fetch_timeout,
        cancel.clone(),
    )?);
    let metrics = fetcher.metrics();

    let outcome = gather_documents(
        descriptors,
        Arc::clone(&fetcher),
        settings.politeness_delay,
        cancel.clone(),
    )
    .await;

    if cancel.is_cancelled() {
        return Err(IngestError::Interrupted);
    }
    if outcome.documents.is_empty() {
        return Err(IngestError::EmptyResult);
    }

    let chunks = chunking::split_documents(
        &outcome.documents,
        settings.chunk_size,
        settings.chunk_overlap,
    );
    info!(
        documents = outcome.documents.len(),
        chunks = chunks.len(),
        "chunked extracted blocks"
    );

    stores::merge_into_index(&settings.index_dir, &chunks, provider).await?;
    let entries = manifest::build_manifest(&chunks);
    manifest::write_manifest(&settings.index_dir, &entries).await?;

    Ok(RunSummary {
        sources,
        pages_fetched: metrics.pages_fetched(),
        fetch_errors: outcome.fetch_errors,
        extract_errors: outcome.extract_errors,
        documents: outcome.documents.len(),
        chunks: chunks.len(),
        peak_in_flight: metrics.peak_in_flight(),
    })
}
