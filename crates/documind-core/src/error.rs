//! Error taxonomy shared by every DocuMind component.
//!
//! Each variant maps to one user-visible failure class. Callers branch on
//! [`DocQaError::kind`] rather than on message text. An empty retrieval is
//! never represented here: it is a valid, successful result.

use thiserror::Error;

/// Distinguishable failure classes surfaced to the calling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    UnsupportedFormat,
    UnreadableDocument,
    DimensionMismatch,
    EmbeddingUnavailable,
    GenerationUnavailable,
    NoDocumentIndexed,
}

#[derive(Error, Debug)]
pub enum DocQaError {
    /// Bad chunking or retrieval parameters. Caller's fault, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("unreadable document: {0}")]
    UnreadableDocument(String),

    /// Vectors of differing dimension met in one index. Indicates a
    /// service or model mismatch; never retried.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("generation service unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("no document has been indexed")]
    NoDocumentIndexed,
}

impl DocQaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::UnreadableDocument(_) => ErrorKind::UnreadableDocument,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::EmbeddingUnavailable(_) => ErrorKind::EmbeddingUnavailable,
            Self::GenerationUnavailable(_) => ErrorKind::GenerationUnavailable,
            Self::NoDocumentIndexed => ErrorKind::NoDocumentIndexed,
        }
    }

    /// True when trying again later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::EmbeddingUnavailable | ErrorKind::GenerationUnavailable
        )
    }
}

/// Failure reported by an external collaborator (embedding or generation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Rate limit, server error, network error, or timeout.
    #[error("transient: {0}")]
    Transient(String),

    /// Rejected request or malformed response.
    #[error("{0}")]
    Fatal(String),
}

impl ServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, DocQaError>;
