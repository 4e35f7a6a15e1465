//! In-memory vector index.
//!
//! Holds every chunk of the loaded corpus next to its embedding vector.
//! Retrieval is brute-force cosine similarity over all stored vectors,
//! which is adequate for the handful of PDFs a chat session loads.
//!
//! An index is immutable once built. Reloading a corpus builds a new
//! index and the owner swaps it in whole, so a reader never observes a
//! partially populated index.

use std::collections::BTreeSet;

use crate::embedding::cosine_similarity;
use crate::error::PipelineError;
use crate::models::{Chunk, ScoredChunk};

struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Immutable set of chunks and their vectors.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dims: usize,
}

impl VectorIndex {
    /// Pair `chunks` with `vectors` (same order) into a new index.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Index`] if the two sequences differ in
    /// length, if any vector is empty, or if vectors disagree on
    /// dimensionality.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, PipelineError> {
        if chunks.len() != vectors.len() {
            return Err(PipelineError::Index(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dims = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(pos) = vectors.iter().position(|v| v.is_empty() || v.len() != dims) {
            return Err(PipelineError::Index(format!(
                "vector {} has {} dimensions, expected {}",
                pos,
                vectors[pos].len(),
                dims
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Ok(Self { entries, dims })
    }

    /// An index with no chunks.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            dims: 0,
        }
    }

    /// Return up to `k` chunks ordered by descending cosine similarity.
    ///
    /// Ties keep insertion order. An empty index, or `k == 0`, yields an
    /// empty result.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimensionality, `0` for an empty index.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Distinct source paths, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.chunk.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::empty()
    }
}
