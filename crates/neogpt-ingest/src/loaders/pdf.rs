//! PDF document parser.

use super::{file_title, location_of, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use std::path::Path;
use tracing::debug;

/// Parser for PDF files.
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        debug!("Parsing PDF: {:?}", path);

        let raw = pdf_extract::extract_text(path).map_err(|e| {
            IngestError::parse(
                location_of(path),
                format!("Failed to extract text from PDF: {}", e),
            )
        })?;

        // Form feeds mark page breaks
        let page_count = raw.matches('\x0C').count().max(1);
        let content = clean_pdf_text(&raw);

        let metadata = serde_json::json!({
            "format": "pdf",
            "length": content.len(),
            "pages": page_count,
        });

        let mut doc = ParsedDocument::new(content).with_metadata(metadata);
        if let Some(t) = file_title(path) {
            doc = doc.with_title(t);
        }

        debug!("Extracted {} characters from PDF", doc.content.len());

        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Collapse runs of blank lines and turn page breaks into paragraph breaks.
fn clean_pdf_text(text: &str) -> String {
    text.replace('\x0C', "\n\n")
        .lines()
        .map(|line| line.trim())
        .fold(Vec::new(), |mut acc: Vec<&str>, line| {
            let last_was_empty = acc.last().map(|s| s.is_empty()).unwrap_or(false);
            if !(line.is_empty() && last_was_empty) {
                acc.push(line);
            }
            acc
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pdf_text() {
        let messy = "  Hello  \n\n\n\nWorld  \x0C\n\nTest";
        let cleaned = clean_pdf_text(messy);
        assert!(!cleaned.contains("\n\n\n"));
        assert!(!cleaned.contains('\x0C'));
        assert!(cleaned.starts_with("Hello"));
    }

    #[test]
    fn test_pdf_parser_extensions() {
        let parser = PdfParser::new();
        assert!(parser.supports("pdf"));
        assert!(parser.supports("PDF"));
        assert!(!parser.supports("txt"));
    }

    #[test]
    fn test_invalid_pdf_is_parse_error() {
        let mut file = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        std::io::Write::write_all(&mut file, b"not a pdf at all").unwrap();

        let result = PdfParser::new().parse(file.path());
        assert!(matches!(result, Err(IngestError::Parse { .. })));
    }
}
