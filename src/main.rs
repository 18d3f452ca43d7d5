//! # DocuMind CLI (`documind`)
//!
//! Ask grounded questions about a single PDF or text document.
//!
//! ## Usage
//!
//! ```bash
//! documind --config ./config/documind.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `documind stats <file>` | Extract and chunk a file, print statistics (no network) |
//! | `documind ask <file> "<question>"` | Index a file and answer one question with sources |
//! | `documind chat <file>` | Index a file, then answer questions read from stdin |
//! | `documind check` | Verify the generation provider responds |
//!
//! ## Examples
//!
//! ```bash
//! # Preview chunking for a report
//! documind stats report.pdf
//!
//! # One-shot question with the 3 best excerpts
//! documind ask report.pdf "What was Q3 revenue?" --k 3
//!
//! # Verbose retry logging
//! RUST_LOG=documind=debug documind chat notes.txt
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use documind::config;

/// DocuMind CLI: ask questions about a document and get answers grounded
/// in its text, with sources.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "documind",
    about = "DocuMind — grounded question answering over a PDF or text document",
    version,
    long_about = "DocuMind splits a document into overlapping chunks, embeds them, and answers \
    questions using only the most similar chunks, citing the page and excerpt each answer \
    relies on."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/documind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show chunking statistics for a document.
    ///
    /// Runs extraction and chunking only; no embedding or generation
    /// service is contacted.
    Stats {
        /// PDF or text file.
        file: PathBuf,
    },

    /// Index a document and answer one question.
    Ask {
        /// PDF or text file.
        file: PathBuf,

        /// The question to answer.
        question: String,

        /// Number of excerpts to retrieve (default: `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Index a document and answer questions from stdin.
    ///
    /// One question per line; `exit` or EOF ends the session.
    Chat {
        /// PDF or text file.
        file: PathBuf,
    },

    /// Check that the generation provider is reachable.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("documind=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config file not found; using defaults");
        config::Config::default()
    };

    match cli.command {
        Commands::Stats { file } => {
            documind::stats::run_stats(&cfg, &file)?;
        }
        Commands::Ask { file, question, k } => {
            documind::ask::run_ask(&cfg, &file, &question, k).await?;
        }
        Commands::Chat { file } => {
            documind::ask::run_chat(&cfg, &file).await?;
        }
        Commands::Check => {
            documind::ask::run_check(&cfg).await?;
        }
    }

    Ok(())
}
