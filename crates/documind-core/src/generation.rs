//! Generative model trait.
//!
//! Concrete HTTP-backed generators live in the `documind` app crate.

use async_trait::async_trait;

use crate::error::ServiceError;

/// A text-in, text-out language model.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;

    /// Produce a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}
