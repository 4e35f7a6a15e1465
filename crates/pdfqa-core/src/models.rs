//! Core data models that flow through the question-answering pipeline.
//!
//! Documents are produced by ingestion, split into [`Chunk`]s, embedded,
//! and stored in the [`VectorIndex`](crate::index::VectorIndex). Retrieval
//! hands back [`ScoredChunk`]s which become the context of an answer.

use serde::Serialize;
use std::path::PathBuf;

/// A single page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

/// A source PDF after text extraction.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, pages: Vec<Page>) -> Self {
        Self {
            path: path.into(),
            pages,
        }
    }

    /// Path rendered for display and chunk provenance.
    pub fn source(&self) -> String {
        self.path.display().to_string()
    }

    /// True when no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// A bounded, contiguous slice of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Deterministic UUID derived from the source and chunk index.
    pub id: String,
    /// Path of the originating document.
    pub source: String,
    /// Position of the originating document in the loaded batch.
    pub document_index: usize,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Character offset of the first character in the document text.
    pub start: usize,
    /// Page on which the chunk starts.
    pub page: u32,
    pub text: String,
    /// SHA-256 of `text`.
    pub hash: String,
}

/// A chunk paired with its similarity to a query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}
