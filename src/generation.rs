//! Chat-model providers.
//!
//! Each provider implements [`pdfqa_core::generation::Generator`], sending
//! the prompt's system turn and user turn in the shape its API expects:
//! - **[`GeminiGenerator`]**: `generateContent` with a `systemInstruction` (default).
//! - **[`OpenAIGenerator`]**: `/v1/chat/completions`.
//! - **[`OllamaGenerator`]**: `/api/chat` with streaming disabled.
//!
//! A response with no text is a [`PipelineError::GenerationService`] error.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use pdfqa_core::generation::{GenerationParams, Generator};
use pdfqa_core::prompt::Prompt;
use pdfqa_core::PipelineError;

use crate::config::GenerationConfig;
use crate::embedding::{require_env, GEMINI_BASE_URL, OLLAMA_BASE_URL, OPENAI_BASE_URL};
use crate::http;

fn finish(provider: &str, result: Result<String>) -> Result<String, PipelineError> {
    let text = result.map_err(|e| PipelineError::generation(format!("{:#}", e)))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(PipelineError::generation(format!(
            "{} returned an empty completion",
            provider
        )));
    }
    Ok(text.to_string())
}

// ============ Gemini Provider ============

pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".to_string());
        // The URL template already supplies the `models/` segment.
        let model = model
            .strip_prefix("models/")
            .map(str::to_string)
            .unwrap_or(model);

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: http::base_url(config.url.as_deref(), GEMINI_BASE_URL),
            api_key: api_key.into(),
            model,
            max_retries: config.max_retries,
        })
    }

    async fn call(&self, prompt: &Prompt, params: &GenerationParams) -> Result<String> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_output_tokens,
            },
        });
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let json = http::post_json("Gemini", self.max_retries, &body, || {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
        })
        .await?;

        parse_gemini_response(&json)
    }
}

/// Concatenate `candidates[0].content.parts[].text`.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            anyhow!("Gemini returned no answer ({})", reason)
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing content parts"))?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<String, PipelineError> {
        debug!(provider = "gemini", model = %self.model, "generating answer");
        finish("Gemini", self.call(prompt, params).await)
    }
}

// ============ OpenAI Provider ============

pub struct OpenAIGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: http::base_url(config.url.as_deref(), OPENAI_BASE_URL),
            api_key: api_key.into(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            max_retries: config.max_retries,
        })
    }

    async fn call(&self, prompt: &Prompt, params: &GenerationParams) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": params.temperature,
            "max_tokens": params.max_output_tokens,
        });
        let url = format!("{}/v1/chat/completions", self.base_url);

        let json = http::post_json("OpenAI", self.max_retries, &body, || {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
        })
        .await?;

        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<String, PipelineError> {
        debug!(provider = "openai", model = %self.model, "generating answer");
        finish("OpenAI", self.call(prompt, params).await)
    }
}

// ============ Ollama Provider ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: http::base_url(config.url.as_deref(), OLLAMA_BASE_URL),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "llama3.2".to_string()),
            max_retries: config.max_retries,
        })
    }

    async fn call(&self, prompt: &Prompt, params: &GenerationParams) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "stream": false,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_output_tokens,
            },
        });
        let url = format!("{}/api/chat", self.base_url);

        let json =
            http::post_json("Ollama", self.max_retries, &body, || self.client.post(&url)).await?;

        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid Ollama response: missing message.content"))
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<String, PipelineError> {
        debug!(provider = "ollama", model = %self.model, "generating answer");
        finish("Ollama", self.call(prompt, params).await)
    }
}

/// Create the [`Generator`] named by `config.provider`.
///
/// | Config Value | Provider | Credential |
/// |-------------|----------|------------|
/// | `"gemini"` | [`GeminiGenerator`] | `GOOGLE_API_KEY` |
/// | `"openai"` | [`OpenAIGenerator`] | `OPENAI_API_KEY` |
/// | `"ollama"` | [`OllamaGenerator`] | none |
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "gemini" => {
            let key = require_env("GOOGLE_API_KEY")?;
            Ok(Arc::new(GeminiGenerator::new(config, key)?))
        }
        "openai" => {
            let key = require_env("OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAIGenerator::new(config, key)?))
        }
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_model_prefix_stripped() {
        let config = GenerationConfig {
            model: Some("models/gemini-2.0-flash".to_string()),
            ..Default::default()
        };
        let generator = GeminiGenerator::new(&config, "k").unwrap();
        assert_eq!(generator.model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn test_parse_gemini_joins_parts() {
        let json = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Par" }, { "text": "is." }] } }]
        });
        assert_eq!(parse_gemini_response(&json).unwrap(), "Paris.");
    }

    #[test]
    fn test_parse_gemini_reports_block_reason() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = parse_gemini_response(&json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_blank_completion_is_an_error() {
        let err = finish("X", Ok("   ".to_string())).unwrap_err();
        assert!(matches!(err, PipelineError::GenerationService(_)));
    }
}
