//! Embedding trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus the cosine similarity used by the [`VectorIndex`](crate::index::VectorIndex).
//!
//! Concrete providers (Gemini, OpenAI, Ollama, fastembed) live in the
//! `pdfqa` app crate.

use async_trait::async_trait;

use crate::error::PipelineError;

/// An embedding backend.
///
/// A pipeline holds exactly one embedder and uses it for both corpus
/// chunks and incoming queries, so the two kinds of vectors are always
/// comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"models/embedding-001"`).
    fn model_name(&self) -> &str;

    /// Returns the configured vector dimensionality, or `0` if unknown
    /// until the first response.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per text in input order.
    ///
    /// Network, authentication, quota and timeout failures are reported as
    /// [`PipelineError::EmbeddingService`].
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

/// Embed a single query text through `embedder`.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, PipelineError> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::embedding("empty embedding response"))
}

/// Cosine of the angle between a query vector and a chunk vector, in
/// `[-1.0, 1.0]`. Higher ranks first during retrieval.
///
/// Returns `0.0` when the lengths differ or either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
