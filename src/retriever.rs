//! Question → ranked chunks.
//!
//! Embeds the question through the [`EmbeddingGateway`], queries the
//! document's vector index, and resolves each hit back to its stored
//! [`Chunk`](documind_core::models::Chunk). Read-only over the index, so
//! any number of retrievals may run concurrently against one index.

use documind_core::index::DocumentIndex;
use documind_core::models::{RetrievalResult, ScoredChunk};
use documind_core::{DocQaError, Result};
use tracing::debug;

use crate::embedding::EmbeddingGateway;

#[derive(Clone)]
pub struct Retriever {
    gateway: EmbeddingGateway,
    min_score: Option<f32>,
}

impl Retriever {
    /// `min_score`, when set, drops entries scoring below it. With no
    /// threshold the top `k` are returned however weak they are.
    pub fn new(gateway: EmbeddingGateway, min_score: Option<f32>) -> Self {
        Self { gateway, min_score }
    }

    pub fn gateway(&self) -> &EmbeddingGateway {
        &self.gateway
    }

    /// Retrieve up to `k` chunks for `question`, best first.
    ///
    /// An index with no chunks yields an empty result without contacting
    /// the embedding service.
    pub async fn retrieve(
        &self,
        index: &DocumentIndex,
        question: &str,
        k: usize,
    ) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(DocQaError::Configuration("k must be at least 1".into()));
        }
        if index.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let vector = self.gateway.embed_one(question).await?;
        let hits = index.nearest(&vector, k)?;

        let mut entries = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            if self.min_score.is_some_and(|min| score < min) {
                continue;
            }
            let chunk = index.chunk(id).ok_or_else(|| {
                DocQaError::Configuration(format!("index returned unknown chunk id {}", id))
            })?;
            entries.push(ScoredChunk {
                chunk: chunk.clone(),
                score,
            });
        }

        debug!(k, returned = entries.len(), "retrieved chunks");
        Ok(RetrievalResult { entries })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use documind_core::embedding::{EmbedRole, EmbeddingProvider};
    use documind_core::models::Chunk;
    use documind_core::ServiceError;

    use super::*;
    use crate::retry::RetryPolicy;

    /// Embeds every question as the x axis.
    #[derive(Default)]
    struct XAxis {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for XAxis {
        fn model_name(&self) -> &str {
            "x-axis"
        }
        fn dims(&self) -> Option<usize> {
            Some(2)
        }
        async fn embed(
            &self,
            texts: &[String],
            _role: EmbedRole,
        ) -> std::result::Result<Vec<Vec<f32>>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn retriever(provider: Arc<XAxis>, min_score: Option<f32>) -> Retriever {
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(1),
        };
        Retriever::new(EmbeddingGateway::new(provider, policy, 8), min_score)
    }

    fn chunk(id: usize) -> Chunk {
        Chunk {
            id,
            text: format!("chunk {}", id),
            start: id * 10,
            end: id * 10 + 7,
            page: None,
        }
    }

    /// Rows score exactly 1.0, 0.0 and -1.0 against the x axis.
    fn axis_index() -> DocumentIndex {
        let vectors = vec![vec![0.0, 2.0], vec![3.0, 0.0], vec![-1.0, 0.0]];
        DocumentIndex::build((0..3).map(chunk).collect(), &vectors).unwrap()
    }

    #[tokio::test]
    async fn test_score_equal_to_threshold_is_kept() {
        let index = axis_index();

        let result = retriever(Arc::default(), Some(0.0))
            .retrieve(&index, "q", 3)
            .await
            .unwrap();
        assert_eq!(result.chunk_ids(), vec![1, 0]);
        assert_eq!(result.entries[1].score, 0.0);

        let result = retriever(Arc::default(), Some(1.0))
            .retrieve(&index, "q", 3)
            .await
            .unwrap();
        assert_eq!(result.chunk_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_no_threshold_returns_weak_matches() {
        let result = retriever(Arc::default(), None)
            .retrieve(&axis_index(), "q", 3)
            .await
            .unwrap();
        assert_eq!(result.chunk_ids(), vec![1, 0, 2]);
        assert_eq!(result.entries[2].score, -1.0);
    }

    #[tokio::test]
    async fn test_zero_k_rejected_before_embedding() {
        let provider = Arc::new(XAxis::default());
        let err = retriever(provider.clone(), None)
            .retrieve(&axis_index(), "q", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DocQaError::Configuration(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_index_skips_embedding() {
        let provider = Arc::new(XAxis::default());
        let index = DocumentIndex::build(Vec::new(), &[]).unwrap();
        let result = retriever(provider.clone(), None)
            .retrieve(&index, "q", 3)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
