//! Core domain types for NeoGPT.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ops::AddAssign;
use uuid::Uuid;

/// Unique identifier for chunks.
pub type ChunkId = String;

/// Unique identifier for agent sessions.
pub type SessionId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stable chunk identifier derived from where the chunk came from.
///
/// Re-ingesting the same source yields the same ids, so the index replaces
/// chunks instead of duplicating them.
pub fn chunk_id(source_location: &str, sequence: u32) -> ChunkId {
    let mut hasher = Sha256::new();
    hasher.update(source_location.as_bytes());
    hasher.update(b"\0");
    hasher.update(sequence.to_le_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Broad shape of an ingestible source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    File,
    Url,
    SocialChat,
    Code,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Url => "url",
            SourceKind::SocialChat => "social_chat",
            SourceKind::Code => "code",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ingestible unit: a file path or a URL.
///
/// Fields are read-only; a classified copy is produced by [`Source::classified`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    location: String,
    kind: SourceKind,
    pattern: Option<String>,
}

impl Source {
    /// Create a source, inferring file vs. URL from the location.
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let kind = if is_web_location(&location) {
            SourceKind::Url
        } else {
            SourceKind::File
        };
        Self {
            location,
            kind,
            pattern: None,
        }
    }

    /// Copy of this source carrying the kind and pattern a classifier resolved.
    pub fn classified(&self, kind: SourceKind, pattern: impl Into<String>) -> Self {
        Self {
            location: self.location.clone(),
            kind,
            pattern: Some(pattern.into()),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// The extension or pattern that matched during classification.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn is_url(&self) -> bool {
        self.kind == SourceKind::Url
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.location)
    }
}

/// Whether a location string names an HTTP(S) resource.
pub fn is_web_location(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Programming languages recognised for language-aware splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Go,
    Java,
    Kotlin,
    Js,
    Ts,
    Php,
    Proto,
    Python,
    Rst,
    Ruby,
    Rust,
    Scala,
    Swift,
    Markdown,
    Latex,
    Html,
    Sol,
    CSharp,
    Cobol,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Js => "js",
            Language::Ts => "ts",
            Language::Php => "php",
            Language::Proto => "proto",
            Language::Python => "python",
            Language::Rst => "rst",
            Language::Ruby => "ruby",
            Language::Rust => "rust",
            Language::Scala => "scala",
            Language::Swift => "swift",
            Language::Markdown => "markdown",
            Language::Latex => "latex",
            Language::Html => "html",
            Language::Sol => "sol",
            Language::CSharp => "csharp",
            Language::Cobol => "cobol",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies which loader parses a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderId {
    Pdf,
    Text,
    Csv,
    Html,
    Tsv,
    Email,
    Epub,
    Excel,
    PowerPoint,
    Word,
    Markdown,
    Json,
    Youtube,
    RecursiveUrl,
    WebPage,
    WhatsAppChat,
    Code(Language),
}

impl LoaderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderId::Pdf => "pdf",
            LoaderId::Text => "text",
            LoaderId::Csv => "csv",
            LoaderId::Html => "html",
            LoaderId::Tsv => "tsv",
            LoaderId::Email => "email",
            LoaderId::Epub => "epub",
            LoaderId::Excel => "excel",
            LoaderId::PowerPoint => "powerpoint",
            LoaderId::Word => "word",
            LoaderId::Markdown => "markdown",
            LoaderId::Json => "json",
            LoaderId::Youtube => "youtube",
            LoaderId::RecursiveUrl => "recursive_url",
            LoaderId::WebPage => "web_page",
            LoaderId::WhatsAppChat => "whatsapp_chat",
            LoaderId::Code(_) => "code",
        }
    }

    /// Language tag for code loaders.
    pub fn language(&self) -> Option<Language> {
        match self {
            LoaderId::Code(lang) => Some(*lang),
            _ => None,
        }
    }

    /// Whether the loader reads over the network.
    pub fn is_web(&self) -> bool {
        matches!(
            self,
            LoaderId::Youtube | LoaderId::RecursiveUrl | LoaderId::WebPage
        )
    }
}

impl std::fmt::Display for LoaderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderId::Code(lang) => write!(f, "code:{}", lang),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// A source bound to the loader that will parse it. Resolved once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderBinding {
    pub source: Source,
    pub loader: LoaderId,
}

impl LoaderBinding {
    pub fn new(source: Source, loader: LoaderId) -> Self {
        Self { source, loader }
    }
}

/// A unit of extracted text with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source_location: String,
    pub sequence: u32,
    pub content: String,
    pub language: Option<Language>,
    pub metadata: serde_json::Value,
}

impl Chunk {
    pub fn new(source_location: impl Into<String>, sequence: u32, content: impl Into<String>) -> Self {
        let source_location = source_location.into();
        Self {
            id: chunk_id(&source_location, sequence),
            source_location,
            sequence,
            content: content.into(),
            language: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Token accounting returned from language-model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub calls: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.calls += other.calls;
    }
}
