//! Run configuration sourced from `WEBGLEAN_*` environment variables.
//!
//! A `config.env` file in the working directory is honored before the process
//! environment; existing variables are never overridden.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 200;
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;
pub const DEFAULT_INDEX_DIR: &str = "vector_index";
pub const DEFAULT_MODEL_ENDPOINT: &str = "http://127.0.0.1:1234/v1";
pub const DEFAULT_MODEL_EMBEDDING: &str = "text-embedding-mxbai-embed-large-v1";
pub const DEFAULT_MODEL_CHAT: &str = "gpt-oss-20b";

/// Knobs for one ingestion or query run.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Global (and per-host) cap on simultaneous fetches.
    pub concurrency: usize,
    /// Per-request timeout; the only timeout in the pipeline.
    pub fetch_timeout: Duration,
    /// Pause after each fetch, taken after the concurrency slot is released.
    pub politeness_delay: Duration,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Directory holding `index.json` and `manifest.json`; its presence
    /// selects append semantics over create.
    pub index_dir: PathBuf,
    pub model_endpoint: String,
    pub model_embedding: String,
    pub model_chat: String,
    pub api_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            politeness_delay: Duration::from_millis(DEFAULT_POLITENESS_DELAY_MS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            model_endpoint: DEFAULT_MODEL_ENDPOINT.to_string(),
            model_embedding: DEFAULT_MODEL_EMBEDDING.to_string(),
            model_chat: DEFAULT_MODEL_CHAT.to_string(),
            api_key: "dummy-key".to_string(),
        }
    }
}

impl Settings {
    /// Builds settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename("config.env");
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            concurrency: env_parse("WEBGLEAN_CONCURRENCY", defaults.concurrency).max(1),
            fetch_timeout: Duration::from_secs(env_parse(
                "WEBGLEAN_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )),
            politeness_delay: Duration::from_millis(env_parse(
                "WEBGLEAN_PAUSE_MS",
                DEFAULT_POLITENESS_DELAY_MS,
            )),
            chunk_size: env_parse("WEBGLEAN_CHUNK_SIZE", defaults.chunk_size).max(1),
            chunk_overlap: env_parse("WEBGLEAN_CHUNK_OVERLAP", defaults.chunk_overlap),
            index_dir: PathBuf::from(env_or("WEBGLEAN_INDEX_DIR", DEFAULT_INDEX_DIR)),
            model_endpoint: env_or("WEBGLEAN_MODEL_ENDPOINT", DEFAULT_MODEL_ENDPOINT),
            model_embedding: env_or("WEBGLEAN_MODEL_EMBEDDING", DEFAULT_MODEL_EMBEDDING),
            model_chat: env_or("WEBGLEAN_MODEL_CHAT", DEFAULT_MODEL_CHAT),
            api_key: env_or("WEBGLEAN_API_KEY", "dummy-key"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_knobs() {
        let settings = Settings::default();
        assert_eq!(settings.concurrency, 5);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(15));
        assert_eq!(settings.politeness_delay, Duration::from_millis(200));
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.chunk_overlap, 150);
        assert_eq!(settings.index_dir, PathBuf::from("vector_index"));
    }
}
