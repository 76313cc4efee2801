//! Interactive retrieval loop over a persisted index.
//!
//! Embeds each question through the same endpoint used at ingest time,
//! retrieves the closest chunks, and asks the chat model to answer from
//! that context. Type `exit` to quit.

use std::io::Write;
use std::process::ExitCode;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::FmtSubscriber;

use webglean::config::Settings;
use webglean::embeddings::{EmbeddingProvider, HttpEmbeddingProvider};
use webglean::stores::{FlatVectorStore, VectorBackend};
use webglean::types::IngestError;

const TOP_K: usize = 4;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let settings = Settings::from_env();

    let store = match FlatVectorStore::load(&settings.index_dir).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("cannot open index at {}: {err}", settings.index_dir.display());
            return ExitCode::FAILURE;
        }
    };
    println!(
        "Loaded {} chunks from {}",
        store.len(),
        settings.index_dir.display()
    );

    let provider = HttpEmbeddingProvider::new(
        &settings.model_endpoint,
        &settings.model_embedding,
        &settings.api_key,
    );
    let chat = ChatClient::new(
        &settings.model_endpoint,
        &settings.model_chat,
        &settings.api_key,
    );
    let print_context = std::env::var("WEBGLEAN_PRINT_CONTEXT")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        print!("\nYour question (or type 'exit'): ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => break,
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        match answer(&store, &provider, &chat, question, print_context).await {
            Ok(answer) => println!("\n{answer}"),
            Err(err) => eprintln!("query failed: {err}"),
        }
    }

    ExitCode::SUCCESS
}

async fn answer(
    store: &FlatVectorStore,
    provider: &HttpEmbeddingProvider,
    chat: &ChatClient,
    question: &str,
    print_context: bool,
) -> Result<String, IngestError> {
    let query_embedding = provider.embed(question).await?;
    let hits = store.search_similar(&query_embedding, TOP_K).await?;

    if print_context {
        for (chunk, score) in &hits {
            println!("[{score:.3}] {}: {}", chunk.source, chunk.content);
        }
    }

    let context = hits
        .iter()
        .map(|(chunk, _)| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let prompt = format!(
        "Use the following pieces of context to answer the question at the end.\n\
         If the context doesn't provide enough information, just say that you \
         don't know, don't try to make up an answer.\n\
         Include as much details as possible.\n\
         {context}\n\
         Question: {question}\n\
         Helpful Answer:"
    );

    chat.complete(&prompt).await
}

/// Minimal client for an OpenAI-compatible `/chat/completions` endpoint.
struct ChatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ChatClient {
    fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, IngestError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let tag = |err: reqwest::Error| IngestError::Chat(err.to_string());
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(tag)?
            .error_for_status()
            .map_err(tag)?;

        let parsed: ChatResponse = response.json().await.map_err(tag)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| IngestError::Chat("response contained no choices".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
