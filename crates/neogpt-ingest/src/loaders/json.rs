//! JSON parser: flattens a document into `path: value` lines.

use super::{file_title, location_of, read_text, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use serde_json::Value;
use std::path::Path;

pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", prefix, i), child, out);
            }
        }
        Value::String(s) => out.push(format!("{}: {}", prefix, s)),
        Value::Null => {}
        other => out.push(format!("{}: {}", prefix, other)),
    }
}

impl DocumentParser for JsonParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        let raw = read_text(path)?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| IngestError::parse(location_of(path), e))?;

        let mut lines = Vec::new();
        flatten("", &value, &mut lines);

        let metadata = serde_json::json!({
            "format": "json",
            "fields": lines.len(),
        });
        let mut doc = ParsedDocument::new(lines.join("\n")).with_metadata(metadata);
        if let Some(t) = file_title(path) {
            doc = doc.with_title(t);
        }
        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }
}
