//! Core data models used throughout DocuMind.
//!
//! These types represent the documents, chunks, retrieval results, and
//! answers that flow through the indexing and query phases.

use serde::Serialize;

/// Source format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    /// Resolve a format from a file name, bare extension, or MIME type.
    ///
    /// Accepts `"report.pdf"`, `"pdf"`, `".PDF"`, `"application/pdf"`,
    /// `"notes.txt"`, `"txt"`, `"text/plain"`. Returns `None` for anything else.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_ascii_lowercase();
        match hint.as_str() {
            "application/pdf" => return Some(Self::Pdf),
            "text/plain" => return Some(Self::Text),
            _ => {}
        }
        let ext = hint.rsplit('.').next().unwrap_or(&hint);
        match ext {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
        }
    }
}

/// Extracted document text, transient until chunking completes.
///
/// `page_starts` holds the character offset at which each page begins
/// (ascending, first entry `0`). It is empty for formats without pages.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub format: DocumentFormat,
    pub page_starts: Vec<usize>,
}

impl Document {
    /// A plain-text document with no page structure.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: DocumentFormat::Text,
            page_starts: Vec::new(),
        }
    }

    /// Join per-page texts with a blank line, recording where each page starts.
    pub fn from_pages<S: AsRef<str>>(pages: &[S], format: DocumentFormat) -> Self {
        let mut text = String::new();
        let mut page_starts = Vec::with_capacity(pages.len());
        let mut offset = 0usize;
        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                text.push_str("\n\n");
                offset += 2;
            }
            page_starts.push(offset);
            let page = page.as_ref();
            text.push_str(page);
            offset += page.chars().count();
        }
        Self {
            text,
            format,
            page_starts,
        }
    }

    /// 1-based page number containing the character at `offset`.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        if self.page_starts.is_empty() {
            return None;
        }
        let idx = self.page_starts.partition_point(|&start| start <= offset);
        Some(idx.max(1) as u32)
    }
}

/// A contiguous slice of document text, the unit of indexing and citation.
///
/// Offsets are character offsets into the source text, half-open
/// (`start..end`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Dense ordinal, `0..N-1` in document order.
    pub id: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub page: Option<u32>,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// One entry of a retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Ordered retrieval result, descending by score, at most `k` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub entries: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn chunk_ids(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.chunk.id).collect()
    }

    /// Display views of each entry, in retrieval order.
    pub fn sources(&self, document: Option<&str>, preview_chars: usize) -> Vec<Source> {
        self.entries
            .iter()
            .map(|e| Source::from_scored(e, document, preview_chars))
            .collect()
    }
}

/// Generated answer plus the exact retrieval it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub retrieval: RetrievalResult,
    /// Name of the document the retrieval came from, when known.
    pub document: Option<String>,
}

/// Summary of an indexed document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub total_chunks: usize,
    pub total_characters: usize,
    pub avg_chunk_size: usize,
}

impl DocumentStats {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let total_chunks = chunks.len();
        let total_characters: usize = chunks.iter().map(Chunk::char_len).sum();
        let avg_chunk_size = if total_chunks > 0 {
            total_characters / total_chunks
        } else {
            0
        };
        Self {
            total_chunks,
            total_characters,
            avg_chunk_size,
        }
    }
}

/// Human-facing attribution for one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    /// Name of the document the chunk belongs to.
    pub document: Option<String>,
    pub chunk_id: usize,
    pub page: Option<u32>,
    /// Similarity as a percentage, rounded to one decimal.
    pub similarity: f32,
    pub preview: String,
}

impl Source {
    pub fn from_scored(entry: &ScoredChunk, document: Option<&str>, preview_chars: usize) -> Self {
        let mut preview: String = entry.chunk.text.chars().take(preview_chars).collect();
        if entry.chunk.text.chars().count() > preview_chars {
            preview.push_str("...");
        }
        Self {
            document: document.map(str::to_string),
            chunk_id: entry.chunk.id,
            page: entry.chunk.page,
            similarity: (entry.score * 1000.0).round() / 10.0,
            preview,
        }
    }

    pub fn page_label(&self) -> String {
        self.page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
