//! Generative model implementations.
//!
//! Each [`Generator`] sends the fully-assembled grounding prompt as a
//! single user turn and returns the model's text. Retry and timeouts are
//! applied by the [`AnswerComposer`](crate::composer::AnswerComposer).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use documind_core::generation::Generator;
use documind_core::ServiceError;
use serde_json::json;

use crate::config::GenerationConfig;
use crate::embedding::GEMINI_BASE_URL;
use crate::http::{build_client, post_json};

/// Fails every call; used when `[generation]` is not configured.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str) -> Result<String, ServiceError> {
        Err(ServiceError::Fatal(
            "Generation provider is disabled. Set [generation] provider in config.".to_string(),
        ))
    }
}

// ============ OpenAI ============

/// Chat completions via `POST /v1/chat/completions`. Requires `OPENAI_API_KEY`.
pub struct OpenAIGenerator {
    model: String,
    url: String,
    api_key: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            model,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_client(Duration::from_secs(config.timeout_secs))?,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let request = self
            .client
            .post(format!("{}/v1/chat/completions", self.url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key.trim()));
        let json = post_json("OpenAI", request, &body).await?;
        parse_openai_chat(&json)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String, ServiceError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Fatal("Invalid OpenAI response: missing message content".into()))
}

// ============ Ollama ============

/// Non-streaming completion via Ollama's `POST /api/generate`.
pub struct OllamaGenerator {
    model: String,
    url: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        Ok(Self {
            model,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_client(Duration::from_secs(config.timeout_secs))?,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
        });
        let request = self
            .client
            .post(format!("{}/api/generate", self.url.trim_end_matches('/')));
        let json = post_json("Ollama", request, &body).await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Fatal("Invalid Ollama response: missing response".into()))
    }
}

// ============ Gemini ============

/// `generateContent` on the Gemini API. Requires `GEMINI_API_KEY`.
pub struct GeminiGenerator {
    model: String,
    url: String,
    api_key: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Gemini provider"))?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Ok(Self {
            model: model.trim_start_matches("models/").to_string(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_client(Duration::from_secs(config.timeout_secs))?,
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        });
        let request = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.url.trim_end_matches('/'),
                self.model
            ))
            .header("x-goog-api-key", &self.api_key);
        let json = post_json("Gemini", request, &body).await?;
        parse_gemini_content(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_content(json: &serde_json::Value) -> Result<String, ServiceError> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("missing candidates");
            ServiceError::Fatal(format!("Invalid Gemini response: {}", reason))
        })?;
    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

/// Create the configured [`Generator`].
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        "gemini" => Ok(Arc::new(GeminiGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_chat() {
        let json = json!({ "choices": [{ "message": { "role": "assistant", "content": "Paris." } }] });
        assert_eq!(parse_openai_chat(&json).unwrap(), "Paris.");
        assert!(parse_openai_chat(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_parse_gemini_joins_parts() {
        let json = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] } }]
        });
        assert_eq!(parse_gemini_content(&json).unwrap(), "Hello, world");
    }

    #[test]
    fn test_parse_gemini_blocked() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = parse_gemini_content(&json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_ollama_generator_needs_no_key() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            model: Some("llama3".to_string()),
            ..GenerationConfig::default()
        };
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.model_name(), "llama3");
    }
}
