//! Maps a file path or URL to the loader that parses it.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. social-chat file names (`whatsapp_chat.txt`, `chat_export.txt`, ...)
//! 2. document extensions
//! 3. URLs (YouTube, recursive crawl, single page)
//! 4. programming-language extensions
//!
//! Anything else is unsupported.

use crate::error::{IngestError, IngestResult};
use neogpt_core::{is_web_location, Language, LoaderBinding, LoaderId, Source, SourceKind};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// File names that configure the builder and are never ingested as content.
pub const RESERVED_FILE_NAMES: &[&str] = &["builder.url"];

const SOCIAL_CHAT_PATTERN: &str = r"^(chat_|_chat|whatsapp_|whatsapp_chat|whatsapp_chat_|whatsapp_)";

const DOCUMENT_EXTENSIONS: &[(&str, LoaderId)] = &[
    ("pdf", LoaderId::Pdf),
    ("txt", LoaderId::Text),
    ("csv", LoaderId::Csv),
    ("html", LoaderId::Html),
    ("tsv", LoaderId::Tsv),
    ("eml", LoaderId::Email),
    ("epub", LoaderId::Epub),
    ("xls", LoaderId::Excel),
    ("xlsx", LoaderId::Excel),
    ("pptx", LoaderId::PowerPoint),
    ("ppt", LoaderId::PowerPoint),
    ("docx", LoaderId::Word),
    ("doc", LoaderId::Word),
    ("md", LoaderId::Markdown),
    ("json", LoaderId::Json),
];

const CODE_EXTENSIONS: &[(&str, Language)] = &[
    ("cpp", Language::Cpp),
    ("go", Language::Go),
    ("java", Language::Java),
    ("kt", Language::Kotlin),
    ("js", Language::Js),
    ("ts", Language::Ts),
    ("php", Language::Php),
    ("proto", Language::Proto),
    ("py", Language::Python),
    ("rst", Language::Rst),
    ("ruby", Language::Ruby),
    ("rs", Language::Rust),
    ("scala", Language::Scala),
    ("swift", Language::Swift),
    ("markdown", Language::Markdown),
    ("latex", Language::Latex),
    ("html", Language::Html),
    ("sol", Language::Sol),
    ("cs", Language::CSharp),
    ("cobol", Language::Cobol),
];

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

/// Immutable classification tables, built once and shared by reference.
pub struct ClassifierTables {
    social_chat: Regex,
    documents: &'static [(&'static str, LoaderId)],
    code: &'static [(&'static str, Language)],
    reserved: &'static [&'static str],
}

static STANDARD_TABLES: OnceLock<ClassifierTables> = OnceLock::new();

impl ClassifierTables {
    fn new() -> Self {
        Self {
            social_chat: Regex::new(SOCIAL_CHAT_PATTERN).expect("social chat regex must compile"),
            documents: DOCUMENT_EXTENSIONS,
            code: CODE_EXTENSIONS,
            reserved: RESERVED_FILE_NAMES,
        }
    }

    /// The built-in tables.
    pub fn standard() -> &'static ClassifierTables {
        STANDARD_TABLES.get_or_init(ClassifierTables::new)
    }

    /// Whether a file name is reserved for builder configuration.
    pub fn is_reserved(&self, location: &str) -> bool {
        file_name(location)
            .map(|name| self.reserved.iter().any(|r| r.eq_ignore_ascii_case(name)))
            .unwrap_or(false)
    }

    /// Bind a source to its loader. `recursive` selects crawling for plain URLs.
    pub fn classify(&self, source: &Source, recursive: bool) -> IngestResult<LoaderBinding> {
        let location = source.location();

        if self.is_reserved(location) {
            return Err(IngestError::Unsupported(location.to_string()));
        }

        let is_url = source.is_url() || is_web_location(location);

        if !is_url {
            if let Some(name) = file_name(location) {
                let name = name.to_ascii_lowercase();
                if let Some(found) = self.social_chat.find(&name) {
                    let bound = source.classified(SourceKind::SocialChat, found.as_str());
                    return Ok(LoaderBinding::new(bound, LoaderId::WhatsAppChat));
                }
            }
        }

        let extension = extension_of(location, is_url);

        if let Some(ext) = extension.as_deref() {
            if let Some((pattern, loader)) = self.documents.iter().find(|(e, _)| *e == ext) {
                let kind = if is_url { SourceKind::Url } else { SourceKind::File };
                let bound = source.classified(kind, format!(".{}", pattern));
                return Ok(LoaderBinding::new(bound, *loader));
            }
        }

        if is_url {
            let (pattern, loader) = if is_youtube(location) {
                (".youtube", LoaderId::Youtube)
            } else if recursive {
                ("recursive", LoaderId::RecursiveUrl)
            } else {
                ("normal", LoaderId::WebPage)
            };
            let bound = source.classified(SourceKind::Url, pattern);
            return Ok(LoaderBinding::new(bound, loader));
        }

        if let Some(ext) = extension.as_deref() {
            if let Some((pattern, language)) = self.code.iter().find(|(e, _)| *e == ext) {
                let bound = source.classified(SourceKind::Code, format!(".{}", pattern));
                return Ok(LoaderBinding::new(bound, LoaderId::Code(*language)));
            }
        }

        Err(IngestError::Unsupported(location.to_string()))
    }
}

/// Classify with the built-in tables.
pub fn classify(source: &Source, recursive: bool) -> IngestResult<LoaderBinding> {
    ClassifierTables::standard().classify(source, recursive)
}

fn file_name(location: &str) -> Option<&str> {
    Path::new(location).file_name().and_then(|n| n.to_str())
}

/// Lowercased extension. For URLs only the path component counts.
fn extension_of(location: &str, is_url: bool) -> Option<String> {
    let path = if is_url {
        match reqwest::Url::parse(location) {
            Ok(url) => url.path().to_string(),
            Err(_) => return None,
        }
    } else {
        location.to_string()
    };

    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_youtube(location: &str) -> bool {
    let lower = location.trim().to_ascii_lowercase();
    if lower.trim_end_matches('/').ends_with(".youtube") {
        return true;
    }
    reqwest::Url::parse(&lower)
        .ok()
        .and_then(|url| url.host_str().map(|h| YOUTUBE_HOSTS.contains(&h)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_of(location: &str) -> IngestResult<LoaderId> {
        classify(&Source::new(location), false).map(|b| b.loader)
    }

    #[test]
    fn test_document_extensions() {
        assert_eq!(loader_of("docs/a.pdf").unwrap(), LoaderId::Pdf);
        assert_eq!(loader_of("notes.MD").unwrap(), LoaderId::Markdown);
        assert_eq!(loader_of("table.tsv").unwrap(), LoaderId::Tsv);
        assert_eq!(loader_of("legacy.doc").unwrap(), LoaderId::Word);
        assert_eq!(loader_of("deck.pptx").unwrap(), LoaderId::PowerPoint);
        assert_eq!(loader_of("mail.eml").unwrap(), LoaderId::Email);
    }

    #[test]
    fn test_html_is_a_document_not_code() {
        assert_eq!(loader_of("index.html").unwrap(), LoaderId::Html);
    }

    #[test]
    fn test_code_extensions() {
        let binding = classify(&Source::new("src/main.rs"), false).unwrap();
        assert_eq!(binding.loader, LoaderId::Code(Language::Rust));
        assert_eq!(binding.source.kind(), SourceKind::Code);
        assert_eq!(binding.source.pattern(), Some(".rs"));

        assert_eq!(loader_of("app.py").unwrap(), LoaderId::Code(Language::Python));
        assert_eq!(loader_of("Program.CS").unwrap(), LoaderId::Code(Language::CSharp));
    }

    #[test]
    fn test_social_chat_wins_over_extension() {
        let binding = classify(&Source::new("exports/WhatsApp_Chat with Bob.txt"), false).unwrap();
        assert_eq!(binding.loader, LoaderId::WhatsAppChat);
        assert_eq!(binding.source.kind(), SourceKind::SocialChat);

        assert_eq!(loader_of("chat_family.txt").unwrap(), LoaderId::WhatsAppChat);
        assert_eq!(loader_of("my_chat.txt").unwrap(), LoaderId::Text);
    }

    #[test]
    fn test_urls() {
        assert_eq!(loader_of("https://example.com/page").unwrap(), LoaderId::WebPage);
        assert_eq!(
            classify(&Source::new("https://example.com/page"), true).unwrap().loader,
            LoaderId::RecursiveUrl
        );
        assert_eq!(
            loader_of("https://www.youtube.com/watch?v=abc").unwrap(),
            LoaderId::Youtube
        );
        assert_eq!(loader_of("https://youtu.be/abc").unwrap(), LoaderId::Youtube);
        assert_eq!(loader_of("https://example.com/paper.pdf").unwrap(), LoaderId::Pdf);
    }

    #[test]
    fn test_unsupported_and_reserved() {
        assert!(matches!(
            loader_of("b.unknownext"),
            Err(IngestError::Unsupported(_))
        ));
        assert!(matches!(loader_of("README"), Err(IngestError::Unsupported(_))));
        assert!(matches!(
            loader_of("documents/builder.url"),
            Err(IngestError::Unsupported(_))
        ));
        assert!(ClassifierTables::standard().is_reserved("x/BUILDER.URL"));
    }

    #[test]
    fn test_deterministic() {
        for location in ["a.pdf", "b.unknownext", "https://example.com/page", "main.go"] {
            let first = loader_of(location).ok();
            let second = loader_of(location).ok();
            assert_eq!(first, second);
        }
    }
}
