//! Per-document question-answering session.
//!
//! A [`Session`] owns at most one indexed document at a time. Indexing
//! builds the new [`DocumentIndex`] completely off to the side and swaps
//! it in only on success, so a query sees either the old index in full
//! or the new one in full. A failed indexing run leaves the previous
//! index (and chat history) untouched.
//!
//! Only one indexing run proceeds at a time; questions run concurrently
//! with each other and with indexing, each against the index that was
//! current when it started.
//!
//! ```text
//! process_document ──▶ chunk ──▶ embed_batch ──▶ build ──▶ swap
//!
//! ask ──▶ snapshot index ──▶ retrieve ──▶ compose ──▶ Answer
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use chrono::{DateTime, Utc};
use documind_core::chunk::chunk_document;
use documind_core::embedding::EmbeddingProvider;
use documind_core::generation::Generator;
use documind_core::index::DocumentIndex;
use documind_core::models::{Answer, Document, DocumentStats, RetrievalResult, Source};
use documind_core::{DocQaError, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::composer::AnswerComposer;
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingGateway};
use crate::extract::extract_text;
use crate::generation::create_generator;
use crate::retriever::Retriever;

/// Returned by a successful indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReady {
    pub document_name: String,
    pub stats: DocumentStats,
}

/// One answered question.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub asked_at: DateTime<Utc>,
}

struct IndexedDocument {
    name: String,
    index: DocumentIndex,
    stats: DocumentStats,
}

pub struct Session {
    chunk_size: usize,
    overlap: usize,
    top_k: usize,
    preview_chars: usize,
    retriever: Retriever,
    composer: AnswerComposer,
    current: RwLock<Option<Arc<IndexedDocument>>>,
    history: RwLock<Vec<ChatTurn>>,
    indexing: tokio::sync::Mutex<()>,
}

impl Session {
    /// Build a session around explicit collaborators.
    pub fn new(
        config: &Config,
        provider: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let gateway = EmbeddingGateway::new(
            provider,
            config.embedding.retry_policy(),
            config.embedding.batch_size,
        );
        Self {
            chunk_size: config.chunking.chunk_size,
            overlap: config.chunking.overlap,
            top_k: config.retrieval.top_k,
            preview_chars: config.retrieval.preview_chars,
            retriever: Retriever::new(gateway, config.retrieval.min_score),
            composer: AnswerComposer::new(generator, config.generation.retry_policy()),
            current: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            indexing: tokio::sync::Mutex::new(()),
        }
    }

    /// Build a session with the providers named in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider =
            create_provider(&config.embedding).context("Failed to create embedding provider")?;
        let generator =
            create_generator(&config.generation).context("Failed to create generation provider")?;
        Ok(Self::new(config, provider, generator))
    }

    /// Chunk, embed, and index `document`, replacing any current index.
    ///
    /// Empty text yields an index with zero chunks: every question is then
    /// answered with the no-relevant-content reply.
    ///
    /// # Errors
    ///
    /// `Configuration` for bad chunking parameters, `EmbeddingUnavailable`
    /// or `DimensionMismatch` from the embedding service. On error the
    /// previous index stays active.
    pub async fn process_document(
        &self,
        name: impl Into<String>,
        document: Document,
    ) -> Result<IndexReady> {
        let name = name.into();
        let _indexing = self.indexing.lock().await;

        let result = self.build_index(&document).await;
        let (index, stats) = match result {
            Ok(built) => built,
            Err(e) => {
                warn!(document = %name, error = %e, "indexing failed; keeping previous index");
                return Err(e);
            }
        };

        let indexed = Arc::new(IndexedDocument {
            name: name.clone(),
            index,
            stats,
        });
        self.replace_current(Some(indexed));

        info!(
            document = %name,
            chunks = stats.total_chunks,
            characters = stats.total_characters,
            "document indexed"
        );
        Ok(IndexReady {
            document_name: name,
            stats,
        })
    }

    /// Index raw text with no page structure.
    pub async fn process_text(&self, name: impl Into<String>, text: &str) -> Result<IndexReady> {
        self.process_document(name, Document::plain(text)).await
    }

    /// Extract text from `bytes` (PDF or plain text) and index it.
    ///
    /// `format_hint` is a file name, extension, or MIME type.
    pub async fn process_bytes(
        &self,
        name: impl Into<String>,
        bytes: &[u8],
        format_hint: &str,
    ) -> Result<IndexReady> {
        let document = extract_text(bytes, format_hint)?;
        self.process_document(name, document).await
    }

    async fn build_index(&self, document: &Document) -> Result<(DocumentIndex, DocumentStats)> {
        let chunks = chunk_document(document, self.chunk_size, self.overlap)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.retriever.gateway().embed_batch(&texts).await?;
        let index = DocumentIndex::build(chunks, &vectors)?;
        let stats = DocumentStats::from_chunks(index.chunks());
        Ok((index, stats))
    }

    /// Retrieve up to `k` chunks (default `top_k`) without generating.
    pub async fn retrieve(&self, question: &str, k: Option<usize>) -> Result<RetrievalResult> {
        let current = self.snapshot()?;
        self.retriever
            .retrieve(&current.index, question, k.unwrap_or(self.top_k))
            .await
    }

    /// Answer `question` from the current document.
    ///
    /// # Errors
    ///
    /// `NoDocumentIndexed` before any successful indexing run;
    /// `EmbeddingUnavailable` or `GenerationUnavailable` when a service
    /// fails after retries.
    pub async fn ask(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        let current = self.snapshot()?;
        let retrieval = self
            .retriever
            .retrieve(&current.index, question, k.unwrap_or(self.top_k))
            .await?;
        let mut answer = self.composer.answer(question, retrieval).await?;
        answer.document = Some(current.name.clone());

        // A question that started before a re-index belongs to the old
        // document's history, which is already gone.
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        if self.peek().is_some_and(|doc| Arc::ptr_eq(&doc, &current)) {
            history.push(ChatTurn {
                question: question.to_string(),
                answer: answer.text.clone(),
                sources: self.sources(&answer),
                asked_at: Utc::now(),
            });
        }
        drop(history);

        Ok(answer)
    }

    /// Display views of the chunks an answer was grounded on.
    pub fn sources(&self, answer: &Answer) -> Vec<Source> {
        answer
            .retrieval
            .sources(answer.document.as_deref(), self.preview_chars)
    }

    /// Drop the current document and chat history.
    pub fn clear(&self) {
        self.replace_current(None);
        info!("session cleared");
    }

    /// Number of chunks in the current index; 0 when nothing is indexed.
    pub fn chunk_count(&self) -> usize {
        self.peek().map(|doc| doc.index.len()).unwrap_or(0)
    }

    pub fn document_name(&self) -> Option<String> {
        self.peek().map(|doc| doc.name.clone())
    }

    pub fn stats(&self) -> Option<DocumentStats> {
        self.peek().map(|doc| doc.stats)
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send a readiness prompt to the generative model and return its reply.
    pub async fn check_generation(&self) -> Result<String> {
        self.composer.check().await
    }

    /// Swap the current document and empty the history as one step.
    ///
    /// Lock order is history, then current, matching [`Session::ask`], so
    /// no turn can land between the swap and the clear.
    fn replace_current(&self, doc: Option<Arc<IndexedDocument>>) {
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = doc;
        history.clear();
    }

    fn peek(&self) -> Option<Arc<IndexedDocument>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn snapshot(&self) -> Result<Arc<IndexedDocument>> {
        self.peek().ok_or(DocQaError::NoDocumentIndexed)
    }
}
