//! `documind ask`, `documind chat`, and `documind check`.
//!
//! Answers go to stdout; progress and diagnostics go through `tracing`
//! to stderr.

use std::path::Path;

use anyhow::{Context, Result};
use documind_core::models::{Answer, Source};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::session::Session;

/// Index `path` into a fresh session.
async fn open(config: &Config, path: &Path) -> Result<Session> {
    let session = Session::from_config(config)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let ready = session
        .process_bytes(&name, &bytes, &name)
        .await
        .with_context(|| format!("Failed to index {}", path.display()))?;
    println!(
        "Indexed {}: {} chunks, {} characters (avg {} per chunk)",
        ready.document_name,
        ready.stats.total_chunks,
        ready.stats.total_characters,
        ready.stats.avg_chunk_size
    );
    println!();
    Ok(session)
}

/// Answer a single question about `path`.
pub async fn run_ask(config: &Config, path: &Path, question: &str, k: Option<usize>) -> Result<()> {
    let session = open(config, path).await?;
    let answer = session.ask(question, k).await?;
    print_answer(&answer, &session.sources(&answer));
    Ok(())
}

/// Interactive loop: one question per stdin line until EOF or `exit`.
pub async fn run_chat(config: &Config, path: &Path) -> Result<()> {
    let session = open(config, path).await?;
    println!("Ask a question (type `exit` to quit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        match session.ask(question, None).await {
            Ok(answer) => print_answer(&answer, &session.sources(&answer)),
            // Service outages end one question, not the session.
            Err(e) if e.is_recoverable() => println!("Error: {}\n", e),
            Err(e) => return Err(e.into()),
        }
    }

    println!("{} questions answered.", session.history().len());
    Ok(())
}

/// Round-trip a readiness prompt through the generation provider.
pub async fn run_check(config: &Config) -> Result<()> {
    let session = Session::from_config(config)?;
    let reply = session.check_generation().await?;
    println!("Generation provider '{}' OK", config.generation.provider);
    println!("  Reply: {}", reply);
    Ok(())
}

fn print_answer(answer: &Answer, sources: &[Source]) {
    println!("{}", answer.text);
    println!();
    if sources.is_empty() {
        println!("No sources.");
    } else {
        println!("Sources:");
        for (i, source) in sources.iter().enumerate() {
            println!(
                "{}. {} [page {}] chunk {} ({:.1}%)",
                i + 1,
                source.document.as_deref().unwrap_or("document"),
                source.page_label(),
                source.chunk_id,
                source.similarity
            );
            println!("    {}", source.preview.replace('\n', " "));
        }
    }
    println!();
}
