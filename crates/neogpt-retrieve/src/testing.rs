//! In-process collaborators for strategy tests. Every fake counts its calls.

use async_trait::async_trait;
use neogpt_core::{
    Chunk, ChunkId, Embedder, Error, Fetcher, Generation, IndexMatch, LanguageModel, Result,
    TableRows, TableSchema, TableStore, Usage, VectorIndex, WebSearch,
};
use neogpt_db::InMemoryIndex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::Selector;

/// 26 dimensions, one per ASCII letter.
pub fn letter_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; 26];
    for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
        vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    vector
}

#[derive(Default)]
pub struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(letter_vector(text))
    }
}

#[derive(Default)]
pub struct CountingIndex {
    inner: InMemoryIndex,
    calls: AtomicUsize,
}

impl CountingIndex {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.add(chunks, embeddings).await
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search(query, k).await
    }

    async fn search_within(
        &self,
        query: &[f32],
        k: usize,
        chunk_ids: &[ChunkId],
    ) -> Result<Vec<IndexMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search_within(query, k, chunk_ids).await
    }

    async fn remove_source(&self, location: &str) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_source(location).await
    }

    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }
}

/// Replies with the first rule whose needle occurs in the prompt, else "".
#[derive(Default)]
pub struct ScriptedModel {
    rules: Mutex<Vec<(String, String)>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_when(&self, needle: &str, reply: &str) {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), reply.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<Generation> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let text = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_default();

        Ok(Generation {
            usage: Usage {
                prompt_tokens: prompt.split_whitespace().count() as u64,
                completion_tokens: text.split_whitespace().count() as u64,
                calls: 1,
            },
            text,
        })
    }
}

#[derive(Default)]
pub struct StaticSearch {
    urls: Mutex<Vec<String>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StaticSearch {
    pub fn set(&self, urls: &[&str]) {
        *self.urls.lock().unwrap() = urls.iter().map(|u| u.to_string()).collect();
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearch for StaticSearch {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("search offline".to_string()));
        }
        Ok(self.urls.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn serve(&self, url: &str, html: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Fetch {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
            })
    }
}

/// A table store with no tables.
#[derive(Default)]
pub struct EmptyTables {
    calls: AtomicUsize,
}

impl EmptyTables {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableStore for EmptyTables {
    async fn schemas(&self) -> Result<Vec<TableSchema>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn query(&self, _sql: &str) -> Result<TableRows> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TableRows::default())
    }
}

/// Every collaborator a selector can use.
pub struct Kit {
    pub embedder: Arc<CountingEmbedder>,
    pub index: Arc<CountingIndex>,
    pub model: Arc<ScriptedModel>,
    pub search: Arc<StaticSearch>,
    pub fetcher: Arc<StaticFetcher>,
    pub tables: Arc<EmptyTables>,
}

impl Kit {
    pub fn new() -> Self {
        Self {
            embedder: Arc::default(),
            index: Arc::default(),
            model: Arc::default(),
            search: Arc::default(),
            fetcher: Arc::default(),
            tables: Arc::default(),
        }
    }

    /// A selector wired to every fake.
    pub fn selector(&self) -> Selector {
        Selector::new(self.embedder.clone(), self.index.clone())
            .with_model(self.model.clone())
            .with_web(self.search.clone(), self.fetcher.clone())
            .with_tables(self.tables.clone())
    }

    /// Index one chunk per document without touching the counters.
    pub async fn seed(&self, docs: &[(&str, &str)]) {
        let chunks: Vec<Chunk> = docs
            .iter()
            .map(|(location, content)| Chunk::new(*location, 0, *content))
            .collect();
        let vectors: Vec<Vec<f32>> = docs.iter().map(|(_, content)| letter_vector(content)).collect();
        self.index.inner.add(&chunks, &vectors).await.unwrap();
    }

    pub fn total_calls(&self) -> usize {
        self.embedder.calls()
            + self.index.calls()
            + self.model.calls()
            + self.search.calls()
            + self.fetcher.calls()
            + self.tables.calls()
    }
}
