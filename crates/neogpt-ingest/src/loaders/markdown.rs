//! Markdown document parser.

use super::{file_title, read_text, DocumentParser, ParsedDocument};
use crate::error::IngestResult;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use std::path::Path;

/// Parser for Markdown files.
pub struct MarkdownParser;

/// Plain text, first H1 and link targets of a markdown document.
struct Extracted {
    text: String,
    title: Option<String>,
    links: Vec<String>,
}

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(markdown: &str) -> Extracted {
        let mut text = String::new();
        let mut title: Option<String> = None;
        let mut links = Vec::new();
        let mut heading: Option<(HeadingLevel, String)> = None;

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::Heading(level, _, _)) => {
                    heading = Some((level, String::new()));
                }
                Event::End(Tag::Heading(_, _, _)) => {
                    if let Some((level, current)) = heading.take() {
                        if level == HeadingLevel::H1 && title.is_none() {
                            title = Some(current.trim().to_string());
                        }
                        text.push_str(current.trim());
                        text.push_str("\n\n");
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => text.push_str("\n```\n"),
                Event::End(Tag::CodeBlock(_)) => text.push_str("```\n\n"),
                Event::Start(Tag::Link(_, dest, _)) => links.push(dest.to_string()),
                Event::End(Tag::Paragraph) => text.push_str("\n\n"),
                Event::End(Tag::List(_)) => text.push('\n'),
                Event::Start(Tag::Item) => text.push_str("- "),
                Event::End(Tag::Item) => text.push('\n'),
                Event::Text(t) => match heading.as_mut() {
                    Some((_, current)) => current.push_str(&t),
                    None => text.push_str(&t),
                },
                Event::Code(code) => {
                    text.push('`');
                    text.push_str(&code);
                    text.push('`');
                }
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                _ => {}
            }
        }

        Extracted {
            text: text.trim().to_string(),
            title,
            links,
        }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for MarkdownParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        let content = read_text(path)?;
        let extracted = Self::extract(&content);

        let metadata = serde_json::json!({
            "format": "markdown",
            "links": extracted.links,
            "original_length": content.len(),
        });

        let mut doc = ParsedDocument::new(extracted.text).with_metadata(metadata);
        if let Some(t) = extracted.title.or_else(|| file_title(path)) {
            doc = doc.with_title(t);
        }

        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &["md"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_markdown() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(
            file,
            r#"# My Document

This is a paragraph with some text.

## Section One

More content here with a [link](https://example.com).

```rust
fn main() {{
    println!("Hello");
}}
```

- Item one
- Item two
"#
        )
        .unwrap();

        let docs = MarkdownParser::new().parse(file.path()).unwrap();
        let doc = &docs[0];

        assert_eq!(doc.title, Some("My Document".to_string()));
        assert!(doc.content.contains("This is a paragraph"));
        assert!(doc.content.contains("Section One"));
        assert!(doc.content.contains("fn main()"));
        assert!(doc.content.contains("- Item two"));

        let links = doc.metadata["links"].as_array().unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0], "https://example.com");
    }

    #[test]
    fn test_no_title_uses_file_name() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(file, "Just some text without a heading.").unwrap();

        let docs = MarkdownParser::new().parse(file.path()).unwrap();
        assert!(docs[0].title.is_some());
    }
}
