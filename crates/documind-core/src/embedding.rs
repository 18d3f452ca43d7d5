//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, plus [`l2_normalize`], which the vector index applies to
//! every row and query so that a dot product is a cosine similarity.
//!
//! Concrete provider implementations (OpenAI, Ollama, Gemini, fastembed)
//! and the retrying gateway live in the `documind` app crate.

use async_trait::async_trait;

use crate::error::ServiceError;

/// What a text is being embedded for.
///
/// Some services produce better vectors when told whether the input is a
/// document passage or a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedRole {
    Document,
    Query,
}

/// Trait for embedding providers.
///
/// One call maps a batch of texts to one vector per text, in input order.
/// Providers report failures as [`ServiceError`]; retrying transient ones
/// is the caller's job.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the configured vector dimensionality, if known up front.
    fn dims(&self) -> Option<usize>;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String], role: EmbedRole)
        -> Result<Vec<Vec<f32>>, ServiceError>;
}

/// Scale a vector to unit length in place. Zero vectors are left as-is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}
