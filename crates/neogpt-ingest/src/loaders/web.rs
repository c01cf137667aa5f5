//! Single web page loader.

use super::html::html_to_text;
use super::ParsedDocument;
use crate::error::IngestResult;
use neogpt_core::Fetcher;
use std::sync::Arc;
use tracing::debug;

/// Fetches a page and keeps its visible text.
#[derive(Clone)]
pub struct WebPageLoader {
    fetcher: Arc<dyn Fetcher>,
}

impl WebPageLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub async fn load(&self, url: &str) -> IngestResult<ParsedDocument> {
        let body = self.fetcher.fetch(url).await?;
        debug!("Fetched {} ({} bytes)", url, body.len());

        let (content, title) = html_to_text(&body);

        let mut doc = ParsedDocument::new(content).with_metadata(serde_json::json!({
            "format": "html",
            "url": url,
        }));
        if let Some(t) = title {
            doc = doc.with_title(t);
        }
        Ok(doc)
    }
}
