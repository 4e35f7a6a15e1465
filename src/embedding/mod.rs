//! Embedding provider implementations.
//!
//! Every provider implements [`pdfqa_core::embedding::Embedder`]:
//! - **[`GeminiEmbedder`]**: Google Generative Language `batchEmbedContents` (default).
//! - **[`OpenAIEmbedder`]**: OpenAI `/v1/embeddings`.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalEmbedder`**: fastembed, offline after the first model download.
//!
//! Inputs are split into batches of `embedding.batch_size`. Each response
//! must carry exactly one vector per input; anything else is an
//! [`PipelineError::EmbeddingService`] error.
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to instantiate the provider named in the
//! configuration. Credentials are read from the environment there; the
//! provider constructors take them explicitly.

#[cfg(feature = "local-embeddings-fastembed")]
mod local;

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use pdfqa_core::embedding::Embedder;
use pdfqa_core::PipelineError;

use crate::config::EmbeddingConfig;
use crate::http;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Check a provider response against the batch that produced it.
fn check_count(
    provider: &str,
    expected: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>, PipelineError> {
    if vectors.len() != expected {
        return Err(PipelineError::embedding(format!(
            "{} returned {} vectors for {} inputs",
            provider,
            vectors.len(),
            expected
        )));
    }
    if vectors.iter().any(|v| v.is_empty()) {
        return Err(PipelineError::embedding(format!(
            "{} returned an empty vector",
            provider
        )));
    }
    Ok(vectors)
}

fn service_error(e: anyhow::Error) -> PipelineError {
    PipelineError::embedding(format!("{:#}", e))
}

// ============ Gemini Provider ============

/// Embedding provider using the Google Generative Language API.
///
/// Calls `POST /v1beta/{model}:batchEmbedContents` with the API key as the
/// `key` query parameter. The model name is normalized to carry the
/// `models/` prefix the API expects.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| "models/embedding-001".to_string());
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{}", model)
        };

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: http::base_url(config.url.as_deref(), GEMINI_BASE_URL),
            api_key: api_key.into(),
            model,
            dims: config.dims.unwrap_or(768),
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| {
                json!({
                    "model": self.model,
                    "content": { "parts": [{ "text": t }] },
                })
            })
            .collect();
        let body = json!({ "requests": requests });
        let url = format!("{}/v1beta/{}:batchEmbedContents", self.base_url, self.model);

        let json = http::post_json("Gemini", self.max_retries, &body, || {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
        })
        .await?;

        parse_gemini_response(&json)
    }
}

fn parse_gemini_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|item| {
            item.get("values")
                .and_then(http::parse_vector)
                .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing values"))
        })
        .collect()
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(provider = "gemini", batch = batch.len(), "embedding batch");
            let vectors = self.embed_batch(batch).await.map_err(service_error)?;
            out.extend(check_count("Gemini", batch.len(), vectors)?);
        }
        Ok(out)
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls the `POST /v1/embeddings` endpoint with the configured model.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: http::base_url(config.url.as_deref(), OPENAI_BASE_URL),
            api_key: api_key.into(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dims: config.dims.unwrap_or(1536),
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/v1/embeddings", self.base_url);

        let json = http::post_json("OpenAI", self.max_retries, &body, || {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
        })
        .await?;

        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let vector = item
            .get("embedding")
            .and_then(http::parse_vector)
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, vector));
    }
    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(provider = "openai", batch = batch.len(), "embedding batch");
            let vectors = self.embed_batch(batch).await.map_err(service_error)?;
            out.extend(check_count("OpenAI", batch.len(), vectors)?);
        }
        Ok(out)
    }
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default:
/// `http://localhost:11434`). Requires an embedding model to be pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: http::base_url(config.url.as_deref(), OLLAMA_BASE_URL),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "nomic-embed-text".to_string()),
            dims: config.dims.unwrap_or(768),
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/api/embed", self.base_url);

        let json =
            http::post_json("Ollama", self.max_retries, &body, || self.client.post(&url)).await?;

        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|e| {
            http::parse_vector(e)
                .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: embedding is not an array"))
        })
        .collect()
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(provider = "ollama", batch = batch.len(), "embedding batch");
            let vectors = self.embed_batch(batch).await.map_err(service_error)?;
            out.extend(check_count("Ollama", batch.len(), vectors)?);
        }
        Ok(out)
    }
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Provider | Credential |
/// |-------------|----------|------------|
/// | `"gemini"` | [`GeminiEmbedder`] | `GOOGLE_API_KEY` |
/// | `"openai"` | [`OpenAIEmbedder`] | `OPENAI_API_KEY` |
/// | `"ollama"` | [`OllamaEmbedder`] | none |
/// | `"local"` | `LocalEmbedder` (feature `local-embeddings-fastembed`) | none |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "gemini" => {
            let key = require_env("GOOGLE_API_KEY")?;
            Ok(Arc::new(GeminiEmbedder::new(config, key)?))
        }
        "openai" => {
            let key = require_env("OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAIEmbedder::new(config, key)?))
        }
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings-fastembed"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

pub(crate) fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} environment variable not set", name),
    }
}
