//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

/// Message returned to the user when a question arrives before any
/// document set has been loaded.
pub const NOT_READY_MESSAGE: &str = "No PDF loaded yet. Please upload a PDF first.";

/// Errors raised by ingestion, embedding, indexing, and generation.
///
/// Errors from `load` abort the load and leave the previous corpus in
/// place. Errors from `ask` are rendered with [`PipelineError::user_message`]
/// and recorded in the transcript like an answer.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The given path does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but is not a readable PDF.
    #[error("failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The embedding service failed (auth, network, quota, timeout, bad response).
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The generation service failed (auth, network, quota, timeout, bad response).
    #[error("generation service error: {0}")]
    GenerationService(String),

    /// A question was asked before any successful load.
    #[error("{}", NOT_READY_MESSAGE)]
    NotReady,

    /// `load` was called with an empty path list.
    #[error("no documents were given to load")]
    NoDocuments,

    /// The question was blank.
    #[error("query must not be empty")]
    EmptyQuery,

    /// Chunks and vectors could not be assembled into an index.
    #[error("index error: {0}")]
    Index(String),
}

impl PipelineError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingService(message.into())
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationService(message.into())
    }

    /// Short machine-readable code, used by the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Parse { .. } => "parse_error",
            Self::EmbeddingService(_) => "embedding_service_error",
            Self::GenerationService(_) => "generation_service_error",
            Self::NotReady => "not_ready",
            Self::NoDocuments => "no_documents",
            Self::EmptyQuery => "empty_query",
            Self::Index(_) => "index_error",
        }
    }

    /// Text shown in the conversation in place of an answer.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotReady => NOT_READY_MESSAGE.to_string(),
            other => format!("Error: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_renders_literal_message() {
        assert_eq!(PipelineError::NotReady.user_message(), NOT_READY_MESSAGE);
        assert_eq!(PipelineError::NotReady.to_string(), NOT_READY_MESSAGE);
    }

    #[test]
    fn service_errors_are_prefixed() {
        let msg = PipelineError::generation("quota exceeded").user_message();
        assert_eq!(msg, "Error: generation service error: quota exceeded");
    }

    #[test]
    fn not_found_mentions_path() {
        let err = PipelineError::NotFound(PathBuf::from("/tmp/missing.pdf"));
        assert!(err.to_string().contains("/tmp/missing.pdf"));
        assert_eq!(err.code(), "not_found");
    }
}
