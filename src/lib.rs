//! # DocuMind
//!
//! Grounded question answering over a single uploaded document.
//!
//! A document is split into overlapping character chunks, each chunk is
//! embedded by an external service, and the vectors go into an in-memory
//! cosine-similarity index. A question is embedded the same way, the
//! nearest chunks are retrieved, and a generative model answers from
//! those chunks alone. Every answer carries the exact chunks it was
//! grounded on, so callers can cite page and excerpt.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌──────────────┐
//! │ Extract  │──▶│ Chunker │──▶│ Embedding │──▶│ Vector Index │
//! │ PDF/txt  │   │         │   │  Gateway  │   │   (flat)     │
//! └──────────┘   └─────────┘   └─────┬─────┘   └──────┬───────┘
//!                                    │                │
//!                               ┌────▼────────────────▼──┐   ┌──────────┐
//!                   question ──▶│       Retriever        │──▶│ Composer │──▶ Answer
//!                               └────────────────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn demo() -> anyhow::Result<()> {
//! let config = documind::config::load_config("documind.toml".as_ref())?;
//! let session = documind::Session::from_config(&config)?;
//! session.process_text("notes.txt", "The launch is scheduled for March.").await?;
//! let answer = session.ask("When is the launch?", None).await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`embedding`] | Embedding providers and the retrying gateway |
//! | [`generation`] | Generative model providers |
//! | [`retriever`] | Question → ranked chunks |
//! | [`composer`] | Grounding prompt → answer with provenance |
//! | [`session`] | Document lifecycle, atomic index swap, chat history |
//! | [`retry`] | Bounded exponential backoff with per-call timeouts |
//!
//! Runtime-free pieces (chunker, vector index, models, prompt) live in
//! `documind-core` and are re-exported here.

pub mod ask;
pub mod composer;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod http;
pub mod retriever;
pub mod retry;
pub mod session;
pub mod stats;

pub use documind_core::{chunk, index, models, prompt};
pub use documind_core::{DocQaError, ErrorKind, Result, ServiceError};
pub use session::{ChatTurn, IndexReady, Session};
