//! Ingestion entry point: source list in, persisted index + manifest out.

use std::process::ExitCode;

use tracing::{error, warn};
use tracing_subscriber::FmtSubscriber;

use webglean::config::Settings;
use webglean::embeddings::HttpEmbeddingProvider;
use webglean::pipeline::{self, RunSummary};
use webglean::sources;
use webglean::types::CancelFlag;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let settings = Settings::from_env();

    let json_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "web_sources.json".to_string());

    let descriptors = match sources::load_sources(&json_path) {
        Ok(descriptors) => descriptors,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; draining in-flight fetches");
                cancel.cancel();
            }
        });
    }

    let provider = HttpEmbeddingProvider::new(
        &settings.model_endpoint,
        &settings.model_embedding,
        &settings.api_key,
    );

    match pipeline::run(descriptors, &settings, &provider, cancel).await {
        Ok(summary) => {
            report(&summary, &settings);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("ingestion failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn report(summary: &RunSummary, settings: &Settings) {
    println!("Ingestion complete.");
    println!("  sources          : {}", summary.sources);
    println!("  pages fetched    : {}", summary.pages_fetched);
    println!("  fetch errors     : {}", summary.fetch_errors);
    println!("  extract errors   : {}", summary.extract_errors);
    println!("  blocks extracted : {}", summary.documents);
    println!("  chunks written   : {}", summary.chunks);
    println!("  peak in-flight   : {}", summary.peak_in_flight);
    println!("  index directory  : {}", settings.index_dir.display());
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
