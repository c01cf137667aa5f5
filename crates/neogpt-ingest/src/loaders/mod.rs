//! Built-in loaders for the formats the classifier recognises.
//!
//! File formats implement [`DocumentParser`], a synchronous parser run on the
//! blocking pool. Web pages go through [`WebPageLoader`], which fetches
//! before it parses.

mod chat;
mod csv;
mod email;
mod epub;
mod html;
mod json;
mod markdown;
mod office;
mod pdf;
mod text;
mod web;

pub use self::csv::CsvParser;
pub use chat::WhatsAppChatParser;
pub use email::EmailParser;
pub use epub::EpubParser;
pub use html::{html_to_text, HtmlParser};
pub use json::JsonParser;
pub use markdown::MarkdownParser;
pub use office::{OfficeFormat, OfficeParser};
pub use pdf::PdfParser;
pub use text::TextParser;
pub use web::WebPageLoader;

use crate::error::{IngestError, IngestResult};
use std::path::Path;

/// One logical document extracted from a source.
///
/// Most formats yield a single document; row-oriented formats (CSV, TSV)
/// yield one per row.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// The main text content.
    pub content: String,
    /// Document title (if extracted).
    pub title: Option<String>,
    /// Extracted metadata.
    pub metadata: serde_json::Value,
}

impl ParsedDocument {
    /// Create a new parsed document.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
            metadata: serde_json::json!({}),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Trait for file parsers.
pub trait DocumentParser: Send + Sync {
    /// Parse a file at the given path.
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>>;

    /// File extensions this parser reads.
    fn extensions(&self) -> &[&str];

    /// Check if this parser supports the given extension.
    fn supports(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Read a file as UTF-8, replacing invalid sequences.
pub(crate) fn read_text(path: &Path) -> IngestResult<String> {
    if !path.exists() {
        return Err(IngestError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// File name without extension, used as a fallback title.
pub(crate) fn file_title(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

pub(crate) fn location_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
