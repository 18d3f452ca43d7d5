//! # DocuMind Core
//!
//! Runtime-free logic for DocuMind: data models, the error taxonomy,
//! character chunking, the vector index, grounding-prompt assembly, and
//! the collaborator traits for embedding and generation services.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! runtime dependencies. Everything here is synchronous except the
//! collaborator traits, whose futures are driven by the caller.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod prompt;

pub use error::{DocQaError, ErrorKind, Result, ServiceError};
