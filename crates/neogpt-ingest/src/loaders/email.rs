//! RFC 822 message parser (`.eml`).

use super::html::html_to_text;
use super::{file_title, read_text, DocumentParser, ParsedDocument};
use crate::error::IngestResult;
use std::collections::HashMap;
use std::path::Path;

pub struct EmailParser;

impl EmailParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmailParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Headers (lowercased names, folded lines joined) and the raw body.
fn split_message(raw: &str) -> (HashMap<String, String>, &str) {
    let raw = raw.trim_start_matches('\u{feff}');
    let (head, body) = match raw.find("\r\n\r\n") {
        Some(i) if raw.find("\n\n").map_or(true, |j| i < j) => (&raw[..i], &raw[i + 4..]),
        _ => match raw.find("\n\n") {
            Some(i) => (&raw[..i], &raw[i + 2..]),
            None => (raw, ""),
        },
    };

    let mut headers: HashMap<String, String> = HashMap::new();
    let mut last: Option<String> = None;
    for line in head.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some(value) = last.as_ref().and_then(|k| headers.get_mut(k)) {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            headers.entry(name.clone()).or_insert_with(|| value.trim().to_string());
            last = Some(name);
        }
    }
    (headers, body)
}

fn boundary_of(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

fn decode_quoted_printable(body: &str) -> String {
    let joined = body.replace("=\r\n", "").replace("=\n", "");
    let bytes = joined.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Readable text of one MIME entity, preferring `text/plain` in multiparts.
fn entity_text(headers: &HashMap<String, String>, body: &str) -> String {
    let content_type = headers
        .get("content-type")
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "text/plain".to_string());

    if content_type.starts_with("multipart/") {
        let Some(boundary) = headers.get("content-type").and_then(|ct| boundary_of(ct)) else {
            return body.trim().to_string();
        };
        let delimiter = format!("--{}", boundary);
        let parts: Vec<(HashMap<String, String>, &str)> = body
            .split(delimiter.as_str())
            .skip(1)
            .filter(|p| !p.starts_with("--"))
            .map(|p| split_message(p.trim_start_matches(['\r', '\n'])))
            .collect();

        let is_type = |h: &HashMap<String, String>, t: &str| {
            h.get("content-type")
                .map(|ct| ct.to_ascii_lowercase().starts_with(t))
                .unwrap_or(t == "text/plain")
        };
        let chosen = parts
            .iter()
            .find(|(h, _)| is_type(h, "text/plain"))
            .or_else(|| parts.iter().find(|(h, _)| is_type(h, "text/html")))
            .or_else(|| parts.iter().find(|(h, _)| is_type(h, "multipart/")));
        return chosen
            .map(|(h, b)| entity_text(h, b))
            .unwrap_or_default();
    }

    let decoded = match headers.get("content-transfer-encoding") {
        Some(enc) if enc.eq_ignore_ascii_case("quoted-printable") => decode_quoted_printable(body),
        _ => body.to_string(),
    };

    if content_type.starts_with("text/html") {
        html_to_text(&decoded).0
    } else {
        decoded.trim().to_string()
    }
}

impl DocumentParser for EmailParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        let raw = read_text(path)?;
        let (headers, body) = split_message(&raw);

        let mut content = String::new();
        for (label, key) in [("From", "from"), ("To", "to"), ("Date", "date"), ("Subject", "subject")] {
            if let Some(value) = headers.get(key) {
                content.push_str(&format!("{}: {}\n", label, value));
            }
        }
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&entity_text(&headers, body));

        let metadata = serde_json::json!({
            "format": "email",
            "from": headers.get("from"),
            "to": headers.get("to"),
            "date": headers.get("date"),
        });
        let title = headers
            .get("subject")
            .cloned()
            .filter(|s| !s.is_empty())
            .or_else(|| file_title(path));

        let mut doc = ParsedDocument::new(content.trim_end().to_string()).with_metadata(metadata);
        if let Some(t) = title {
            doc = doc.with_title(t);
        }
        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &["eml"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(raw: &str) -> ParsedDocument {
        let mut file = NamedTempFile::with_suffix(".eml").unwrap();
        file.write_all(raw.as_bytes()).unwrap();
        EmailParser::new().parse(file.path()).unwrap().remove(0)
    }

    #[test]
    fn test_plain_message() {
        let doc = parse(
            "From: ada@example.com\nTo: team@example.com\nSubject: Quarterly\n  numbers\n\nRevenue is up.\n",
        );

        assert_eq!(doc.title.as_deref(), Some("Quarterly numbers"));
        assert!(doc.content.starts_with("From: ada@example.com\nTo: team@example.com"));
        assert!(doc.content.ends_with("Revenue is up."));
        assert_eq!(doc.metadata["from"], "ada@example.com");
    }

    #[test]
    fn test_multipart_prefers_plain() {
        let doc = parse(concat!(
            "Subject: Hi\n",
            "Content-Type: multipart/alternative; boundary=\"XYZ\"\n",
            "\n",
            "--XYZ\n",
            "Content-Type: text/html\n",
            "\n",
            "<p>html body</p>\n",
            "--XYZ\n",
            "Content-Type: text/plain\n",
            "Content-Transfer-Encoding: quoted-printable\n",
            "\n",
            "plain =\nbody caf=C3=A9\n",
            "--XYZ--\n",
        ));

        assert!(doc.content.ends_with("plain body café"));
        assert!(!doc.content.contains("html body"));
    }

    #[test]
    fn test_html_only() {
        let doc = parse("Content-Type: text/html\n\n<div>Hello <b>there</b></div>");
        assert_eq!(doc.content, "Hello there");
    }
}
