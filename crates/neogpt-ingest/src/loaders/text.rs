//! Plain text and source code parser.

use super::{file_title, read_text, DocumentParser, ParsedDocument};
use crate::error::IngestResult;
use std::path::Path;

/// Parser for plain text files and source code.
///
/// Code is read verbatim; the language tag and declaration-aware splitting
/// come from the loader binding.
pub struct TextParser;

impl TextParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for TextParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        let content = read_text(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let metadata = serde_json::json!({
            "format": if extension == "txt" { "text" } else { "code" },
            "length": content.len(),
            "lines": content.lines().count(),
        });

        let mut doc = ParsedDocument::new(content).with_metadata(metadata);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            doc = doc.with_title(name);
        } else if let Some(title) = file_title(path) {
            doc = doc.with_title(title);
        }

        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &[
            "txt", "cpp", "go", "java", "kt", "js", "ts", "php", "proto", "py", "rst", "ruby",
            "rs", "scala", "swift", "markdown", "latex", "html", "sol", "cs", "cobol",
        ]
    }
}
