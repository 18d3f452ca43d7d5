//! Fixed-size, overlapping character chunker.
//!
//! Splits document text into [`Chunk`]s of `chunk_size` characters where
//! consecutive chunks share `overlap` characters. Splitting is by Unicode
//! scalar value, not by sentence or token: the boundaries are fully
//! determined by the lengths involved, which keeps chunk identifiers and
//! offsets stable across runs.
//!
//! # Algorithm
//!
//! 1. Validate `chunk_size > 0` and `overlap < chunk_size`.
//! 2. Start at character `0`; each chunk spans `[start, min(start + chunk_size, L))`.
//! 3. Stop once a chunk reaches the end of the text.
//! 4. Otherwise advance `start` by `chunk_size - overlap`.
//!
//! For text of length `L > chunk_size` this yields
//! `ceil((L - overlap) / (chunk_size - overlap))` chunks; one chunk when
//! `0 < L <= chunk_size`; none for empty text.
//!
//! # Example
//!
//! ```rust
//! use documind_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("AAAA BBBB CCCC DDDD", 10, 4).unwrap();
//! let spans: Vec<_> = chunks.iter().map(|c| (c.start, c.end)).collect();
//! assert_eq!(spans, vec![(0, 10), (6, 16), (12, 19)]);
//! ```

use crate::error::{DocQaError, Result};
use crate::models::{Chunk, Document};

/// Split text into overlapping fixed-size chunks.
///
/// Returns chunks with dense identifiers `0..N-1` in document order and
/// no page numbers. Empty text returns an empty vector.
///
/// # Errors
///
/// [`DocQaError::Configuration`] if `chunk_size == 0` or
/// `overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    validate_params(chunk_size, overlap)?;

    // Byte position of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let stride = chunk_size - overlap;
    let mut chunks = Vec::with_capacity(expected_chunk_count(len, chunk_size, overlap));
    let mut start = 0usize;

    while start < len {
        let end = (start + chunk_size).min(len);
        chunks.push(Chunk {
            id: chunks.len(),
            text: text[bounds[start]..bounds[end]].to_string(),
            start,
            end,
            page: None,
        });
        if end == len {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Chunk a [`Document`], tagging each chunk with the page containing its start.
pub fn chunk_document(doc: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let mut chunks = chunk_text(&doc.text, chunk_size, overlap)?;
    for chunk in &mut chunks {
        chunk.page = doc.page_at(chunk.start);
    }
    Ok(chunks)
}

/// Number of chunks [`chunk_text`] produces for a text of `len` characters.
pub fn expected_chunk_count(len: usize, chunk_size: usize, overlap: usize) -> usize {
    if len == 0 || chunk_size == 0 || overlap >= chunk_size {
        return 0;
    }
    if len <= chunk_size {
        return 1;
    }
    (len - overlap).div_ceil(chunk_size - overlap)
}

fn validate_params(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(DocQaError::Configuration(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(DocQaError::Configuration(format!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}
