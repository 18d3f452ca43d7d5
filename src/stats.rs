//! Document statistics without any network calls.
//!
//! Extracts and chunks a file with the configured chunking parameters and
//! prints what indexing would produce. Used by `documind stats` to tune
//! `chunk_size`/`overlap` before paying for embeddings.

use std::path::Path;

use anyhow::{Context, Result};
use documind_core::chunk::chunk_document;
use documind_core::models::DocumentStats;

use crate::config::Config;
use crate::extract::extract_text;

/// Run the stats command: extract, chunk, and print a summary.
pub fn run_stats(config: &Config, path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = extract_text(&bytes, &path.to_string_lossy())?;
    let chunks = chunk_document(
        &document,
        config.chunking.chunk_size,
        config.chunking.overlap,
    )?;
    let stats = DocumentStats::from_chunks(&chunks);

    println!("DocuMind — Document Stats");
    println!("=========================");
    println!();
    println!("  File:        {}", path.display());
    println!("  Format:      {}", document.format.as_str());
    println!("  Size:        {}", format_bytes(bytes.len() as u64));
    if !document.page_starts.is_empty() {
        println!("  Pages:       {}", document.page_starts.len());
    }
    println!("  Characters:  {}", document.text.chars().count());
    println!();
    println!(
        "  Chunking:    size {} / overlap {}",
        config.chunking.chunk_size, config.chunking.overlap
    );
    println!("  Chunks:      {}", stats.total_chunks);
    println!("  Chunked:     {} characters", stats.total_characters);
    println!("  Avg chunk:   {} characters", stats.avg_chunk_size);

    Ok(())
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_run_stats_on_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "a".repeat(2500)).unwrap();
        run_stats(&Config::default(), &path).unwrap();
    }

    #[test]
    fn test_run_stats_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        std::fs::write(&path, b"PK").unwrap();
        assert!(run_stats(&Config::default(), &path).is_err());
    }
}
