//! Embedding providers: the OpenAI-compatible HTTP collaborator and a
//! deterministic mock for tests and offline runs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::types::IngestError;

/// Produces one embedding vector per input text.
///
/// Failures are reported as [`IngestError::Index`]: an unreachable provider
/// aborts the merge, never individual pipeline tasks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError>;

    /// Embeds a batch; the default implementation issues one call per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Client for `POST {base}/embeddings` speaking the `{model, input}` /
/// `{data: [{embedding}]}` wire format.
#[derive(Clone, Debug)]
pub struct HttpEmbeddingProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let tag = |err: reqwest::Error| IngestError::Index(format!("embedding request failed: {err}"));

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(tag)?
            .error_for_status()
            .map_err(tag)?;

        let parsed: EmbeddingResponse = response.json().await.map_err(tag)?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| IngestError::Index("embedding response contained no data".to_string()))
    }
}

/// Deterministic hash-derived vectors; identical text always embeds to the
/// same vector.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        Ok(hash_to_vec(text, self.dimensions))
    }
}

fn hash_to_vec(text: &str, dimensions: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dimensions)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f32) / u32::MAX as f32
        })
        .collect()
}
