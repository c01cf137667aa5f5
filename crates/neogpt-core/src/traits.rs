//! Collaborator traits.
//!
//! The orchestration crates only ever talk to embeddings, vector storage,
//! the network and language models through these traits. Concrete adapters
//! live in `neogpt-ollama`, `neogpt-db` and `neogpt-ingest`.

use crate::error::Result;
use crate::types::{Chunk, ChunkId, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Turns text into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name of the embedding model (stored alongside vectors).
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// A chunk returned from a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Persisted similarity index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace chunks with their embeddings. Returns the number stored.
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize>;

    /// Top `k` matches, best first.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexMatch>>;

    /// Top `k` matches restricted to the given chunk ids, best first.
    async fn search_within(
        &self,
        query: &[f32],
        k: usize,
        chunk_ids: &[ChunkId],
    ) -> Result<Vec<IndexMatch>>;

    /// Drop every chunk extracted from `location`. Returns the number removed.
    async fn remove_source(&self, location: &str) -> Result<usize>;

    /// Number of embedded chunks.
    async fn len(&self) -> Result<usize>;
}

/// Retrieves raw page content.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Live web search returning result URLs, best first.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

/// Output of one language-model call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
}

/// Text generation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation>;
}

/// Table name and column names, used to prompt SQL translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableSchema {
    /// `name(col_a, col_b)` form used in prompts.
    pub fn describe(&self) -> String {
        format!("{}({})", self.name, self.columns.join(", "))
    }
}

/// Rows of a tabular query, every value rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Structured data queried by the `sql` strategy.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn schemas(&self) -> Result<Vec<TableSchema>>;

    /// Execute a read-only query.
    async fn query(&self, sql: &str) -> Result<TableRows>;
}
