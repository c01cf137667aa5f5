//! HTML to text conversion.

use super::{file_title, read_text, DocumentParser, ParsedDocument};
use crate::error::IngestResult;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

struct HtmlPatterns {
    hidden: Regex,
    title: Regex,
    block_end: Regex,
    tag: Regex,
    blank_lines: Regex,
    spaces: Regex,
}

static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();

impl HtmlPatterns {
    fn new() -> Self {
        Self {
            hidden: Regex::new(r"(?is)<(script|style|noscript|template|svg|head|title)\b.*?</(script|style|noscript|template|svg|head|title)\s*>|<!--.*?-->")
                .expect("hidden-block regex must compile"),
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("title regex must compile"),
            block_end: Regex::new(r"(?i)<\s*(br|/p|/div|/h[1-6]|/li|/tr|/section|/article|/pre|/blockquote|/table|/ul|/ol)\b[^>]*>")
                .expect("block regex must compile"),
            tag: Regex::new(r"(?s)<[^>]*>").expect("tag regex must compile"),
            blank_lines: Regex::new(r"\n\s*\n(\s*\n)*").expect("blank-line regex must compile"),
            spaces: Regex::new(r"[ \t\u{a0}]+").expect("space regex must compile"),
        }
    }
}

fn patterns() -> &'static HtmlPatterns {
    PATTERNS.get_or_init(HtmlPatterns::new)
}

/// Decode the handful of entities that show up in ordinary prose.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Visible text of an HTML page, plus its `<title>` if any.
pub fn html_to_text(html: &str) -> (String, Option<String>) {
    let p = patterns();

    let title = p
        .title
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(p.tag.replace_all(m.as_str(), "").trim()))
        .filter(|t| !t.is_empty());

    let body = p.hidden.replace_all(html, " ");
    let body = p.block_end.replace_all(&body, "\n\n");
    let body = p.tag.replace_all(&body, " ");
    let body = decode_entities(&body);
    let body = p.spaces.replace_all(&body, " ");

    let joined = body.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    let text = p.blank_lines.replace_all(&joined, "\n\n");

    (text.trim().to_string(), title)
}

/// Parser for local HTML files.
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for HtmlParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        let html = read_text(path)?;
        let (text, title) = html_to_text(&html);

        let metadata = serde_json::json!({
            "format": "html",
            "original_length": html.len(),
        });

        let mut doc = ParsedDocument::new(text).with_metadata(metadata);
        if let Some(t) = title.or_else(|| file_title(path)) {
            doc = doc.with_title(t);
        }
        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &["html", "htm"]
    }
}
