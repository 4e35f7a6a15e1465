//! Generation trait.
//!
//! Concrete chat-model providers (Gemini, OpenAI, Ollama) live in the
//! `pdfqa` app crate.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::prompt::Prompt;

/// Sampling settings sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 500,
        }
    }
}

/// A generative language model behind a network API.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;

    /// Produce a completion for `prompt`.
    ///
    /// Failures, including an empty completion, are reported as
    /// [`PipelineError::GenerationService`].
    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<String, PipelineError>;
}
