//! Answer composition: grounding prompt in, [`Answer`] out.
//!
//! The retrieval handed to [`AnswerComposer::answer`] is attached to the
//! returned answer unchanged, so the caller can render exactly the
//! sources the model saw.

use std::sync::Arc;

use documind_core::generation::Generator;
use documind_core::models::{Answer, RetrievalResult};
use documind_core::prompt::{build_grounding_prompt, NO_RELEVANT_CONTENT};
use documind_core::{DocQaError, Result};
use tracing::{debug, info};

use crate::retry::{with_retry, RetryPolicy};

/// Prompt used by [`AnswerComposer::check`].
const READINESS_PROMPT: &str = "Reply with exactly: DocuMind is ready.";

#[derive(Clone)]
pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
    policy: RetryPolicy,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Answer `question` from `retrieval`.
    ///
    /// An empty retrieval short-circuits locally with
    /// [`NO_RELEVANT_CONTENT`] and makes no network call.
    ///
    /// # Errors
    ///
    /// [`DocQaError::GenerationUnavailable`] if the model cannot be reached
    /// after retries or rejects the request.
    pub async fn answer(&self, question: &str, retrieval: RetrievalResult) -> Result<Answer> {
        if retrieval.is_empty() {
            debug!("no excerpts retrieved; answering locally");
            return Ok(Answer {
                text: NO_RELEVANT_CONTENT.to_string(),
                retrieval,
                document: None,
            });
        }

        let prompt = build_grounding_prompt(question, &retrieval);
        let text = self.generate(&prompt).await?;
        info!(
            model = self.model_name(),
            excerpts = retrieval.len(),
            "answer generated"
        );

        Ok(Answer {
            text: text.trim().to_string(),
            retrieval,
            document: None,
        })
    }

    /// Round-trip a fixed prompt through the model.
    pub async fn check(&self) -> Result<String> {
        self.generate(READINESS_PROMPT)
            .await
            .map(|reply| reply.trim().to_string())
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let generator = &self.generator;
        with_retry(&self.policy, "generation", || generator.generate(prompt))
            .await
            .map_err(|e| DocQaError::GenerationUnavailable(e.to_string()))
    }
}
