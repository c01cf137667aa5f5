//! CSV and TSV parser: one document per row.

use super::{location_of, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use std::path::Path;

/// Renders each data row as `column: value` lines.
pub struct CsvParser {
    delimiter: u8,
}

impl CsvParser {
    pub fn comma() -> Self {
        Self { delimiter: b',' }
    }

    pub fn tab() -> Self {
        Self { delimiter: b'\t' }
    }
}

impl DocumentParser for CsvParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }
        let location = location_of(path);

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(path)
            .map_err(|e| IngestError::parse(&location, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| IngestError::parse(&location, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut documents = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| IngestError::parse(&location, e))?;
            let content = record
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let column = headers
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("column_{}", i + 1));
                    format!("{}: {}", column, value.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");

            if content.trim().is_empty() {
                continue;
            }

            documents.push(ParsedDocument::new(content).with_metadata(serde_json::json!({
                "format": if self.delimiter == b'\t' { "tsv" } else { "csv" },
                "row": row,
            })));
        }

        Ok(documents)
    }

    fn extensions(&self) -> &[&str] {
        if self.delimiter == b'\t' {
            &["tsv"]
        } else {
            &["csv"]
        }
    }
}
