//! Embedding gateway: the single door through which text becomes vectors.
//!
//! Wraps an [`EmbeddingProvider`] with sub-batching, bounded retry, and
//! shape checks. Every vector that leaves the gateway has the same
//! dimension as every other vector it has produced for the same batch,
//! and matches the configured `dims` when one is set.

use std::sync::Arc;

use documind_core::embedding::{EmbedRole, EmbeddingProvider};
use documind_core::{DocQaError, Result, ServiceError};
use tracing::debug;

use crate::retry::{with_retry, RetryPolicy};

#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    batch_size: usize,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, policy: RetryPolicy, batch_size: usize) -> Self {
        Self {
            provider,
            policy,
            batch_size: batch_size.max(1),
        }
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed document chunks, preserving input order.
    ///
    /// # Errors
    ///
    /// - [`DocQaError::EmbeddingUnavailable`] when the service keeps failing
    ///   after retries, or rejects the request outright.
    /// - [`DocQaError::DimensionMismatch`] when the service returns vectors of
    ///   inconsistent or unexpected length.
    /// - [`DocQaError::EmbeddingUnavailable`] as well when a vector holds NaN
    ///   or infinite values, which would otherwise outrank every real score.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        let mut expected = self.provider.dims();

        for batch in texts.chunks(self.batch_size) {
            debug!(model = self.model_name(), count = batch.len(), "embedding batch");
            let embedded = self.call(batch, EmbedRole::Document).await?;
            for vector in embedded {
                check_vector(&mut expected, &vector)?;
                vectors.push(vector);
            }
        }

        Ok(vectors)
    }

    /// Embed a single question.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut expected = self.provider.dims();
        let input = [text.to_string()];
        let vector = self
            .call(&input, EmbedRole::Query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DocQaError::EmbeddingUnavailable("service returned no vector".into()))?;
        check_vector(&mut expected, &vector)?;
        Ok(vector)
    }

    async fn call(&self, batch: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        let provider = &self.provider;
        let vectors = with_retry(&self.policy, "embedding", || provider.embed(batch, role))
            .await
            .map_err(unavailable)?;

        if vectors.len() != batch.len() {
            return Err(DocQaError::DimensionMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

fn unavailable(err: ServiceError) -> DocQaError {
    DocQaError::EmbeddingUnavailable(err.to_string())
}

/// Reject NaN or infinite components, then check the dimension.
fn check_vector(expected: &mut Option<usize>, vector: &[f32]) -> Result<()> {
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(DocQaError::EmbeddingUnavailable(
            "service returned a vector with non-finite values".into(),
        ));
    }
    let actual = vector.len();
    match *expected {
        Some(dims) if dims != actual => Err(DocQaError::DimensionMismatch {
            expected: dims,
            actual,
        }),
        Some(_) => Ok(()),
        None if actual == 0 => Err(DocQaError::DimensionMismatch {
            expected: 1,
            actual: 0,
        }),
        None => {
            *expected = Some(actual);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted {
        dims: Option<usize>,
        calls: AtomicUsize,
        failures: usize,
        batches: Mutex<Vec<usize>>,
        width: fn(usize) -> usize,
        fill: Option<f32>,
    }

    impl Scripted {
        fn new(failures: usize) -> Self {
            Self {
                dims: None,
                calls: AtomicUsize::new(0),
                failures,
                batches: Mutex::new(Vec::new()),
                width: |_| 3,
                fill: None,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }
        fn dims(&self) -> Option<usize> {
            self.dims
        }
        async fn embed(
            &self,
            texts: &[String],
            _role: EmbedRole,
        ) -> std::result::Result<Vec<Vec<f32>>, ServiceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ServiceError::Transient("503 Service Unavailable".into()));
            }
            self.batches.lock().unwrap().push(texts.len());
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, t)| vec![self.fill.unwrap_or(t.len() as f32); (self.width)(i)])
                .collect())
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            timeout: Duration::from_secs(1),
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| "x".repeat(i + 1)).collect()
    }

    #[tokio::test]
    async fn test_sub_batches_preserve_order() {
        let provider = Arc::new(Scripted::new(0));
        let gateway = EmbeddingGateway::new(provider.clone(), fast_policy(0), 2);
        let vectors = gateway.embed_batch(&texts(5)).await.unwrap();
        assert_eq!(vectors.len(), 5);
        let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(*provider.batches.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let provider = Arc::new(Scripted::new(2));
        let gateway = EmbeddingGateway::new(provider.clone(), fast_policy(3), 8);
        let vector = gateway.embed_one("hello").await.unwrap();
        assert_eq!(vector.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_is_unavailable() {
        let provider = Arc::new(Scripted::new(usize::MAX));
        let gateway = EmbeddingGateway::new(provider.clone(), fast_policy(2), 8);
        let err = gateway.embed_batch(&texts(1)).await.unwrap_err();
        assert!(matches!(err, DocQaError::EmbeddingUnavailable(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_inconsistent_dims_rejected() {
        let mut provider = Scripted::new(0);
        provider.width = |i| if i == 0 { 3 } else { 4 };
        let gateway = EmbeddingGateway::new(Arc::new(provider), fast_policy(0), 8);
        let err = gateway.embed_batch(&texts(2)).await.unwrap_err();
        assert!(matches!(
            err,
            DocQaError::DimensionMismatch { expected: 3, actual: 4 }
        ));
    }

    #[tokio::test]
    async fn test_non_finite_vectors_rejected() {
        let mut provider = Scripted::new(0);
        provider.fill = Some(f32::NAN);
        let gateway = EmbeddingGateway::new(Arc::new(provider), fast_policy(0), 8);
        let err = gateway.embed_one("q").await.unwrap_err();
        assert!(matches!(err, DocQaError::EmbeddingUnavailable(msg) if msg.contains("non-finite")));

        let mut provider = Scripted::new(0);
        provider.fill = Some(f32::INFINITY);
        let gateway = EmbeddingGateway::new(Arc::new(provider), fast_policy(0), 8);
        assert!(gateway.embed_batch(&texts(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_configured_dims_enforced() {
        let mut provider = Scripted::new(0);
        provider.dims = Some(8);
        let gateway = EmbeddingGateway::new(Arc::new(provider), fast_policy(0), 8);
        let err = gateway.embed_one("q").await.unwrap_err();
        assert!(matches!(
            err,
            DocQaError::DimensionMismatch { expected: 8, actual: 3 }
        ));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let provider = Arc::new(Scripted::new(0));
        let gateway = EmbeddingGateway::new(provider.clone(), fast_policy(0), 8);
        assert!(gateway.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
