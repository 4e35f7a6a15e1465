//! Configuration loading.
//!
//! Settings come from a TOML file and may be overridden through `PDFQA_*`
//! environment variables. Every section has defaults, so an empty file (or
//! no file at all) yields a working Gemini-backed configuration.
//!
//! ```toml
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 100
//!
//! [retrieval]
//! top_k = 10
//!
//! [embedding]
//! provider = "gemini"
//! model = "models/embedding-001"
//!
//! [generation]
//! provider = "gemini"
//! model = "gemini-2.0-flash"
//! temperature = 0.3
//! max_output_tokens = 500
//!
//! [server]
//! bind = "127.0.0.1:8501"
//! upload_dir = "./uploads"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use pdfqa_core::chunk::ChunkParams;
use pdfqa_core::generation::GenerationParams;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_top_k() -> usize {
    10
}
fn default_max_context_chars() -> usize {
    12_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama host, API proxy, or test server).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "gemini".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: None,
            url: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_retries: 0,
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "gemini".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_output_tokens() -> u32 {
    500
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

impl Config {
    pub fn chunk_params(&self) -> Result<ChunkParams> {
        Ok(ChunkParams::new(
            self.chunking.chunk_size,
            self.chunking.chunk_overlap,
        )?)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.generation.temperature,
            max_output_tokens: self.generation.max_output_tokens,
        }
    }

    /// Apply `PDFQA_*` overrides read through `lookup`.
    ///
    /// Takes a lookup function rather than reading the process environment
    /// directly so callers (and tests) control the source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PDFQA_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_var("PDFQA_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("PDFQA_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_var("PDFQA_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("PDFQA_TOP_K") {
            self.retrieval.top_k = parse_var("PDFQA_TOP_K", &v)?;
        }
        if let Some(v) = lookup("PDFQA_EMBEDDING_PROVIDER") {
            self.embedding.provider = v;
        }
        if let Some(v) = lookup("PDFQA_EMBEDDING_MODEL") {
            self.embedding.model = Some(v);
        }
        if let Some(v) = lookup("PDFQA_GENERATION_PROVIDER") {
            self.generation.provider = v;
        }
        if let Some(v) = lookup("PDFQA_GENERATION_MODEL") {
            self.generation.model = Some(v);
        }
        if let Some(v) = lookup("PDFQA_TEMPERATURE") {
            self.generation.temperature = parse_var("PDFQA_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("PDFQA_MAX_OUTPUT_TOKENS") {
            self.generation.max_output_tokens = parse_var("PDFQA_MAX_OUTPUT_TOKENS", &v)?;
        }
        if let Some(v) = lookup("PDFQA_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("PDFQA_UPLOAD_DIR") {
            self.server.upload_dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.chunk_params()?;

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!("generation.temperature must be in [0.0, 2.0]");
        }
        if self.generation.max_output_tokens == 0 {
            bail!("generation.max_output_tokens must be > 0");
        }

        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }

        match self.embedding.provider.as_str() {
            "gemini" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be gemini, openai, ollama, or local.",
                other
            ),
        }

        match self.generation.provider.as_str() {
            "gemini" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be gemini, openai, or ollama.",
                other
            ),
        }

        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", name, value))
}

/// Parse and validate a config file, without environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Resolve the effective configuration for the CLI.
///
/// A missing file is only tolerated when `required` is false (the default
/// path); environment overrides are applied last and re-validated.
pub fn resolve_config(path: &Path, required: bool) -> Result<Config> {
    let mut config = if path.exists() || required {
        load_config(path)?
    } else {
        Config::default()
    };
    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}
