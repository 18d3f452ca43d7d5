//! Text extraction for uploaded documents (PDF, plain text).
//!
//! Callers supply bytes plus a format hint (file name, extension, or MIME
//! type); this module returns a [`Document`] whose text is UTF-8 and whose
//! page boundaries are recorded as character offsets. Extraction never
//! panics on bad input: it returns an error and the caller keeps whatever
//! index it already had.

use documind_core::models::{Document, DocumentFormat};
use documind_core::{DocQaError, Result};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Extracts a [`Document`] from raw bytes.
///
/// # Errors
///
/// - [`DocQaError::UnsupportedFormat`] if the hint names neither PDF nor text.
/// - [`DocQaError::UnreadableDocument`] if the bytes cannot be parsed.
pub fn extract_text(bytes: &[u8], format_hint: &str) -> Result<Document> {
    let format = DocumentFormat::from_hint(format_hint)
        .ok_or_else(|| DocQaError::UnsupportedFormat(format_hint.to_string()))?;

    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Text => extract_plain(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<Document> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| DocQaError::UnreadableDocument(format!("PDF extraction failed: {}", e)))?;
    let pages: Vec<&str> = pages.iter().map(|p| p.trim()).collect();
    Ok(Document::from_pages(&pages, DocumentFormat::Pdf))
}

fn extract_plain(bytes: &[u8]) -> Result<Document> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DocQaError::UnreadableDocument(format!("text is not valid UTF-8: {}", e)))?;
    Ok(Document::plain(text.strip_prefix('\u{feff}').unwrap_or(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let doc = extract_text("hello world".as_bytes(), "notes.txt").unwrap();
        assert_eq!(doc.text, "hello world");
        assert_eq!(doc.format, DocumentFormat::Text);
        assert!(doc.page_starts.is_empty());
    }

    #[test]
    fn test_plain_text_strips_bom() {
        let doc = extract_text("\u{feff}abc".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(doc.text, "abc");
    }

    #[test]
    fn test_invalid_utf8_is_unreadable() {
        let err = extract_text(&[0xff, 0xfe, 0x00, 0xc3], "txt").unwrap_err();
        assert!(matches!(err, DocQaError::UnreadableDocument(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = extract_text(b"PK\x03\x04", "slides.pptx").unwrap_err();
        assert!(matches!(err, DocQaError::UnsupportedFormat(hint) if hint == "slides.pptx"));
    }

    #[test]
    fn test_garbage_pdf_is_unreadable() {
        let err = extract_text(b"this is not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, DocQaError::UnreadableDocument(_)));
    }
}
