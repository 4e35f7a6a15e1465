//! The pipeline controller.
//!
//! A [`Pipeline`] owns one embedder, one synthesizer and at most one loaded
//! corpus. It is a two-state machine:
//!
//! ```text
//!            load (ok)                 load (ok, replaces corpus)
//!   EMPTY ─────────────▶ READY ◀───────────────────────────┐
//!     ▲                    │ └──────────────────────────────┘
//!     └──── reset ─────────┘
//! ```
//!
//! A failed load never changes state. Asking in `EMPTY` returns the
//! not-ready message without calling any service.
//!
//! # Concurrency
//!
//! State sits behind a [`tokio::sync::RwLock`]. `load` and `reset` hold the
//! write lock for their whole run, `try_ask` holds the read lock for its
//! whole run, so an ask never sees a half-built index and loads never
//! interleave.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use pdfqa_core::chunk::{split_documents, ChunkParams};
use pdfqa_core::embedding::{embed_query, Embedder};
use pdfqa_core::generation::{GenerationParams, Generator};
use pdfqa_core::index::VectorIndex;
use pdfqa_core::models::ScoredChunk;
use pdfqa_core::prompt::build_prompt;
use pdfqa_core::PipelineError;

use crate::config::{Config, IngestConfig};
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::ingest::ingest;

/// Tunables resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chunk: ChunkParams,
    pub top_k: usize,
    pub max_context_chars: usize,
    pub ingest: IngestConfig,
    pub generation: GenerationParams,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            chunk: config.chunk_params()?,
            top_k: config.retrieval.top_k.max(1),
            max_context_chars: config.retrieval.max_context_chars,
            ingest: config.ingest.clone(),
            generation: config.generation_params(),
        })
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk: ChunkParams::default(),
            top_k: 10,
            max_context_chars: 12_000,
            ingest: IngestConfig::default(),
            generation: GenerationParams::default(),
        }
    }
}

/// Turns a query and its retrieved context into an answer.
pub struct Synthesizer {
    generator: Arc<dyn Generator>,
    params: GenerationParams,
    max_context_chars: usize,
}

impl Synthesizer {
    pub fn new(
        generator: Arc<dyn Generator>,
        params: GenerationParams,
        max_context_chars: usize,
    ) -> Self {
        Self {
            generator,
            params,
            max_context_chars,
        }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        context: &[ScoredChunk],
    ) -> Result<String, PipelineError> {
        let prompt = build_prompt(query, context, self.max_context_chars);
        self.generator.generate(&prompt, &self.params).await
    }
}

/// Counts from a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub sources: Vec<String>,
}

/// Where a piece of retrieved context came from.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub path: String,
    pub page: u32,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Empty,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub documents: usize,
    pub chunks: usize,
    pub sources: Vec<String>,
}

struct Corpus {
    index: VectorIndex,
    sources: Vec<String>,
}

enum State {
    Empty,
    Ready(Arc<Corpus>),
}

pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    synthesizer: Synthesizer,
    settings: PipelineSettings,
    state: RwLock<State>,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: PipelineSettings,
    ) -> Self {
        let synthesizer = Synthesizer::new(
            generator,
            settings.generation,
            settings.max_context_chars,
        );
        Self {
            embedder,
            synthesizer,
            settings,
            state: RwLock::new(State::Empty),
        }
    }

    /// Build a pipeline with the providers named in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            create_embedder(&config.embedding)?,
            create_generator(&config.generation)?,
            PipelineSettings::from_config(config)?,
        ))
    }

    /// Ingest, chunk, embed and index `paths`, replacing any loaded corpus.
    ///
    /// On error the previous state (and corpus, if any) is kept.
    pub async fn load(&self, paths: &[PathBuf]) -> Result<LoadReport, PipelineError> {
        let mut state = self.state.write().await;
        let started = Instant::now();
        info!(files = paths.len(), "loading documents");

        let owned = paths.to_vec();
        let ingest_config = self.settings.ingest.clone();
        let documents = tokio::task::spawn_blocking(move || ingest(&owned, &ingest_config))
            .await
            .map_err(|e| PipelineError::Index(format!("ingest task failed: {}", e)))??;

        let pages = documents.iter().map(|d| d.pages.len()).sum();
        for doc in documents.iter().filter(|d| d.is_blank()) {
            warn!(path = %doc.path.display(), "document has no extractable text");
        }

        let chunks = split_documents(&documents, self.settings.chunk);
        debug!(chunks = chunks.len(), "split documents");

        let index = if chunks.is_empty() {
            VectorIndex::empty()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            VectorIndex::build(chunks, vectors)?
        };

        let report = LoadReport {
            documents: documents.len(),
            pages,
            chunks: index.len(),
            sources: documents.iter().map(|d| d.source()).collect(),
        };

        *state = State::Ready(Arc::new(Corpus {
            index,
            sources: report.sources.clone(),
        }));

        info!(
            documents = report.documents,
            pages = report.pages,
            chunks = report.chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "corpus ready"
        );
        Ok(report)
    }

    /// Answer `query` from the loaded corpus.
    pub async fn try_ask(&self, query: &str) -> Result<Answer, PipelineError> {
        let state = self.state.read().await;
        let corpus = match &*state {
            State::Empty => return Err(PipelineError::NotReady),
            State::Ready(corpus) => Arc::clone(corpus),
        };

        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let hits = if corpus.index.is_empty() {
            Vec::new()
        } else {
            let vector = embed_query(self.embedder.as_ref(), query).await?;
            corpus.index.retrieve(&vector, self.settings.top_k)
        };
        debug!(hits = hits.len(), "retrieved context");

        let text = self.synthesizer.synthesize(query, &hits).await?;
        drop(state);

        Ok(Answer {
            text,
            sources: hits
                .iter()
                .map(|h| Source {
                    path: h.chunk.source.clone(),
                    page: h.chunk.page,
                    score: h.score,
                })
                .collect(),
        })
    }

    /// Answer `query`, rendering any failure as user-facing text.
    pub async fn ask(&self, query: &str) -> String {
        self.answer(query).await.text
    }

    /// Like [`Pipeline::ask`], keeping the sources. A failure becomes an
    /// answer whose text is the error message and whose sources are empty.
    pub async fn answer(&self, query: &str) -> Answer {
        match self.try_ask(query).await {
            Ok(answer) => answer,
            Err(e) => {
                if !matches!(e, PipelineError::NotReady) {
                    warn!(error = %e, "ask failed");
                }
                Answer {
                    text: e.user_message(),
                    sources: Vec::new(),
                }
            }
        }
    }

    /// Drop the loaded corpus.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = State::Empty;
        info!("pipeline reset");
    }

    pub async fn status(&self) -> PipelineStatus {
        match &*self.state.read().await {
            State::Empty => PipelineStatus {
                state: PipelineState::Empty,
                documents: 0,
                chunks: 0,
                sources: Vec::new(),
            },
            State::Ready(corpus) => PipelineStatus {
                state: PipelineState::Ready,
                documents: corpus.sources.len(),
                chunks: corpus.index.len(),
                sources: corpus.sources.clone(),
            },
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}
