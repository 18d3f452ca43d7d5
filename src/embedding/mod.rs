//! Embedding provider implementations.
//!
//! Concrete [`EmbeddingProvider`]s:
//! - **[`DisabledProvider`]**: always fails; used when embeddings are not configured.
//! - **[`OpenAIProvider`]**: `POST /v1/embeddings`.
//! - **[`OllamaProvider`]**: a local Ollama instance's `/api/embed` endpoint.
//! - **[`GeminiProvider`]**: Gemini `batchEmbedContents`, with document/query task types.
//! - **`LocalProvider`**: in-process fastembed (feature `local-embeddings`); no network
//!   calls after the model download.
//!
//! Providers perform exactly one request per call. Batching, retry, and
//! dimension checks belong to the [`gateway`].
//!
//! # Provider Selection
//!
//! ```rust
//! # use documind::config::EmbeddingConfig;
//! # use documind::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```

pub mod gateway;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use documind_core::embedding::{EmbedRole, EmbeddingProvider};
use documind_core::ServiceError;
use serde_json::json;

use crate::config::EmbeddingConfig;
use crate::http::{build_client, json_to_vector, post_json};

pub use gateway::EmbeddingGateway;

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> Option<usize> {
        None
    }
    async fn embed(&self, _texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>, ServiceError> {
        Err(ServiceError::Fatal(
            "Embedding provider is disabled. Set [embedding] provider in config.".to_string(),
        ))
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIProvider {
    model: String,
    dims: Option<usize>,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// # Errors
    ///
    /// Returns an error if `model` is not set or `OPENAI_API_KEY` is missing.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let client = build_client(Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            model,
            dims: config.dims,
            url,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>, ServiceError> {
        let mut body = json!({
            "model": self.model,
            "input": texts,
        });
        if let Some(dims) = self.dims {
            body["dimensions"] = json!(dims);
        }
        let request = self
            .client
            .post(format!("{}/v1/embeddings", self.url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key));
        let json = post_json("OpenAI", request, &body).await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, ServiceError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| ServiceError::Fatal("Invalid OpenAI response: missing data array".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| ServiceError::Fatal("Invalid OpenAI response: missing embedding".into()))?;
        indexed.push((index, json_to_vector(embedding, "OpenAI")?));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default `http://localhost:11434`).
pub struct OllamaProvider {
    model: String,
    dims: Option<usize>,
    url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = build_client(Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            model,
            dims: config.dims,
            url,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>, ServiceError> {
        let body = json!({
            "model": self.model,
            "input": texts,
        });
        let request = self
            .client
            .post(format!("{}/api/embed", self.url.trim_end_matches('/')));
        let json = post_json("Ollama", request, &body).await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, ServiceError> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| ServiceError::Fatal("Invalid Ollama response: missing embeddings array".into()))?
        .iter()
        .map(|e| json_to_vector(e, "Ollama"))
        .collect()
}

// ============ Gemini Provider ============

/// Embedding provider using the Gemini API.
///
/// Chunks are embedded with task type `RETRIEVAL_DOCUMENT` and questions
/// with `RETRIEVAL_QUERY`. Requires `GEMINI_API_KEY`.
pub struct GeminiProvider {
    model: String,
    dims: Option<usize>,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Gemini provider"))?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| GEMINI_BASE_URL.to_string());
        let client = build_client(Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            model: model.trim_start_matches("models/").to_string(),
            dims: config.dims,
            url,
            api_key,
            client,
        })
    }
}

pub(crate) const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn gemini_task_type(role: EmbedRole) -> &'static str {
    match role {
        EmbedRole::Document => "RETRIEVAL_DOCUMENT",
        EmbedRole::Query => "RETRIEVAL_QUERY",
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed(&self, texts: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>, ServiceError> {
        let model_path = format!("models/{}", self.model);
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| {
                let mut req = json!({
                    "model": model_path,
                    "content": { "parts": [{ "text": t }] },
                    "taskType": gemini_task_type(role),
                });
                if let Some(dims) = self.dims {
                    req["outputDimensionality"] = json!(dims);
                }
                req
            })
            .collect();
        let body = json!({ "requests": requests });
        let request = self
            .client
            .post(format!(
                "{}/{}:batchEmbedContents",
                self.url.trim_end_matches('/'),
                model_path
            ))
            .header("x-goog-api-key", &self.api_key);
        let json = post_json("Gemini", request, &body).await?;
        parse_gemini_response(&json)
    }
}

fn parse_gemini_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, ServiceError> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| ServiceError::Fatal("Invalid Gemini response: missing embeddings array".into()))?
        .iter()
        .map(|e| {
            let values = e
                .get("values")
                .ok_or_else(|| ServiceError::Fatal("Invalid Gemini response: missing values".into()))?;
            json_to_vector(values, "Gemini")
        })
        .collect()
}

// ============ Local Provider (fastembed) ============

/// Embedding provider running a model in-process via fastembed.
///
/// The model is downloaded from Hugging Face on first use and cached;
/// afterwards embeddings run offline.
#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        // Validate the name eagerly so a typo fails at startup.
        config_to_fastembed_model(&model_name)?;
        let dims = config.dims.unwrap_or(match model_name.as_str() {
            "bge-base-en-v1.5" | "nomic-embed-text-v1.5" => 768,
            "bge-large-en-v1.5" => 1024,
            _ => 384,
        });
        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1.5",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> Option<usize> {
        Some(self.dims)
    }

    async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>, ServiceError> {
        let texts = texts.to_vec();
        let cache = Arc::clone(&self.model);
        let batch_size = self.batch_size;
        let model_name = self.model_name.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = cache
                .lock()
                .map_err(|_| ServiceError::Fatal("local embedding model lock poisoned".into()))?;
            if guard.is_none() {
                let kind = config_to_fastembed_model(&model_name)
                    .map_err(|e| ServiceError::Fatal(e.to_string()))?;
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(kind).with_show_download_progress(true),
                )
                .map_err(|e| {
                    ServiceError::Fatal(format!("Failed to initialize local embedding model: {}", e))
                })?;
                *guard = Some(model);
            }
            match guard.as_mut() {
                Some(model) => model
                    .embed(texts, Some(batch_size))
                    .map_err(|e| ServiceError::Fatal(format!("Local embedding failed: {}", e))),
                None => Err(ServiceError::Fatal("local embedding model unavailable".into())),
            }
        })
        .await
        .map_err(|e| ServiceError::Fatal(format!("local embedding task failed: {}", e)))?
    }
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"gemini"` | [`GeminiProvider`] |
/// | `"local"` | `LocalProvider` (feature `local-embeddings`) |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        "gemini" => Ok(Arc::new(GeminiProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_reorders_by_index() {
        let json = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        assert!(parse_openai_response(&json!({ "error": "x" })).is_err());
    }

    #[test]
    fn test_parse_ollama() {
        let json = json!({ "embeddings": [[0.5, 0.25], [1.0, 2.0]] });
        assert_eq!(
            parse_ollama_response(&json).unwrap(),
            vec![vec![0.5, 0.25], vec![1.0, 2.0]]
        );
    }

    #[test]
    fn test_parse_gemini() {
        let json = json!({ "embeddings": [{ "values": [0.1, 0.2] }, { "values": [0.3, 0.4] }] });
        let vecs = parse_gemini_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert!((vecs[1][0] - 0.3).abs() < 1e-6);
        assert!(parse_gemini_response(&json!({ "embeddings": [{}] })).is_err());
    }

    #[test]
    fn test_task_types() {
        assert_eq!(gemini_task_type(EmbedRole::Document), "RETRIEVAL_DOCUMENT");
        assert_eq!(gemini_task_type(EmbedRole::Query), "RETRIEVAL_QUERY");
    }

    #[tokio::test]
    async fn test_disabled_provider_fails() {
        let err = DisabledProvider
            .embed(&["x".to_string()], EmbedRole::Query)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "nope".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }
}
