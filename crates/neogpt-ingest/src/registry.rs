//! Loader Adapter Registry.
//!
//! Every [`LoaderId`] maps to exactly one capability through an exhaustive
//! `match`, so adding a format means adding one arm. Loaders without an
//! adapter resolve to [`LoaderCapability::Unavailable`] and fail with
//! [`IngestError::NoAdapter`].

use crate::chunker::{ChunkConfig, Chunker};
use crate::error::{IngestError, IngestResult};
use crate::loaders::{
    CsvParser, DocumentParser, EmailParser, EpubParser, HtmlParser, JsonParser, MarkdownParser,
    OfficeFormat, OfficeParser, ParsedDocument, PdfParser, TextParser, WebPageLoader,
    WhatsAppChatParser,
};
use neogpt_core::{Chunk, Fetcher, LoaderBinding, LoaderId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Legacy binary Office extensions that classify but cannot be read.
const LEGACY_OFFICE_PATTERNS: &[&str] = &[".doc", ".ppt", ".xls"];

/// What a loader id resolves to.
#[derive(Clone)]
pub enum LoaderCapability {
    /// Synchronous parser over a local file.
    File(Arc<dyn DocumentParser>),
    /// Fetch-then-parse over HTTP.
    Web(WebPageLoader),
    Unavailable { reason: &'static str },
}

impl LoaderCapability {
    pub fn is_available(&self) -> bool {
        !matches!(self, LoaderCapability::Unavailable { .. })
    }
}

/// Immutable mapping from loader ids to adapters, plus the chunker applied to
/// everything they produce.
pub struct LoaderRegistry {
    text: Arc<dyn DocumentParser>,
    markdown: Arc<dyn DocumentParser>,
    pdf: Arc<dyn DocumentParser>,
    csv: Arc<dyn DocumentParser>,
    tsv: Arc<dyn DocumentParser>,
    json: Arc<dyn DocumentParser>,
    html: Arc<dyn DocumentParser>,
    email: Arc<dyn DocumentParser>,
    epub: Arc<dyn DocumentParser>,
    docx: Arc<dyn DocumentParser>,
    pptx: Arc<dyn DocumentParser>,
    xlsx: Arc<dyn DocumentParser>,
    chat: Arc<dyn DocumentParser>,
    web: WebPageLoader,
    chunker: Chunker,
}

impl LoaderRegistry {
    /// The built-in adapters.
    pub fn standard(fetcher: Arc<dyn Fetcher>, chunk_config: ChunkConfig) -> Self {
        Self {
            text: Arc::new(TextParser::new()),
            markdown: Arc::new(MarkdownParser::new()),
            pdf: Arc::new(PdfParser::new()),
            csv: Arc::new(CsvParser::comma()),
            tsv: Arc::new(CsvParser::tab()),
            json: Arc::new(JsonParser::new()),
            html: Arc::new(HtmlParser::new()),
            email: Arc::new(EmailParser::new()),
            epub: Arc::new(EpubParser::new()),
            docx: Arc::new(OfficeParser::new(OfficeFormat::Docx)),
            pptx: Arc::new(OfficeParser::new(OfficeFormat::Pptx)),
            xlsx: Arc::new(OfficeParser::new(OfficeFormat::Xlsx)),
            chat: Arc::new(WhatsAppChatParser::new()),
            web: WebPageLoader::new(fetcher),
            chunker: Chunker::new(chunk_config),
        }
    }

    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        self.web.fetcher().clone()
    }

    /// Adapter for a loader id.
    pub fn resolve(&self, loader: LoaderId) -> LoaderCapability {
        match loader {
            LoaderId::Pdf => LoaderCapability::File(self.pdf.clone()),
            LoaderId::Text | LoaderId::Code(_) => LoaderCapability::File(self.text.clone()),
            LoaderId::Csv => LoaderCapability::File(self.csv.clone()),
            LoaderId::Tsv => LoaderCapability::File(self.tsv.clone()),
            LoaderId::Html => LoaderCapability::File(self.html.clone()),
            LoaderId::Email => LoaderCapability::File(self.email.clone()),
            LoaderId::Epub => LoaderCapability::File(self.epub.clone()),
            LoaderId::Excel => LoaderCapability::File(self.xlsx.clone()),
            LoaderId::PowerPoint => LoaderCapability::File(self.pptx.clone()),
            LoaderId::Word => LoaderCapability::File(self.docx.clone()),
            LoaderId::Markdown => LoaderCapability::File(self.markdown.clone()),
            LoaderId::Json => LoaderCapability::File(self.json.clone()),
            LoaderId::WhatsAppChat => LoaderCapability::File(self.chat.clone()),
            LoaderId::WebPage | LoaderId::RecursiveUrl => LoaderCapability::Web(self.web.clone()),
            LoaderId::Youtube => LoaderCapability::Unavailable {
                reason: "video transcripts are not supported",
            },
        }
    }

    /// Adapter for a concrete binding. Legacy Office files and remote
    /// non-HTML documents have none.
    pub fn resolve_binding(&self, binding: &LoaderBinding) -> LoaderCapability {
        let pattern = binding.source.pattern().unwrap_or_default();
        if LEGACY_OFFICE_PATTERNS.contains(&pattern) {
            return LoaderCapability::Unavailable {
                reason: "legacy binary Office formats are not supported",
            };
        }

        match self.resolve(binding.loader) {
            LoaderCapability::File(_) if binding.source.is_url() => {
                if binding.loader == LoaderId::Html {
                    LoaderCapability::Web(self.web.clone())
                } else {
                    LoaderCapability::Unavailable {
                        reason: "remote documents are not downloaded",
                    }
                }
            }
            capability => capability,
        }
    }

    /// Parse one bound source into ordered chunks.
    pub async fn parse(&self, binding: &LoaderBinding) -> IngestResult<Vec<Chunk>> {
        let location = binding.source.location().to_string();

        let documents = match self.resolve_binding(binding) {
            LoaderCapability::File(parser) => {
                let path = PathBuf::from(&location);
                tokio::task::spawn_blocking(move || parser.parse(&path))
                    .await
                    .map_err(|e| {
                        let reason = if e.is_panic() { "loader panicked" } else { "loader task cancelled" };
                        IngestError::parse(&location, reason)
                    })??
            }
            LoaderCapability::Web(loader) => vec![loader.load(&location).await?],
            LoaderCapability::Unavailable { reason } => {
                debug!("No adapter for {} ({}): {}", location, binding.loader, reason);
                return Err(IngestError::NoAdapter(binding.loader));
            }
        };

        Ok(self.chunk_documents(binding, documents))
    }

    /// Split documents into chunks numbered continuously across the source.
    fn chunk_documents(&self, binding: &LoaderBinding, documents: Vec<ParsedDocument>) -> Vec<Chunk> {
        let location = binding.source.location();
        let language = binding.loader.language();
        let mut chunks = Vec::new();
        let mut sequence: u32 = 0;

        for doc in documents {
            for piece in self.chunker.split(&doc.content, language) {
                let mut metadata = match &doc.metadata {
                    serde_json::Value::Object(map) => map.clone(),
                    _ => serde_json::Map::new(),
                };
                metadata.insert("loader".into(), binding.loader.to_string().into());
                metadata.insert("kind".into(), binding.source.kind().as_str().into());
                if let Some(title) = &doc.title {
                    metadata.insert("title".into(), title.clone().into());
                }

                chunks.push(
                    Chunk::new(location, sequence, piece)
                        .with_language(language)
                        .with_metadata(serde_json::Value::Object(metadata)),
                );
                sequence += 1;
            }
        }

        debug!("{} produced {} chunks", location, chunks.len());
        chunks
    }
}
