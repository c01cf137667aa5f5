//! `VectorIndex` over the SQLite database.

use crate::database::Database;
use async_trait::async_trait;
use neogpt_core::{Chunk, ChunkId, Error, IndexMatch, Result, VectorIndex};
use std::collections::HashSet;
use tracing::debug;

/// Persistent index; rusqlite calls run on the blocking pool.
#[derive(Clone)]
pub struct SqliteIndex {
    db: Database,
    model: String,
}

impl SqliteIndex {
    /// `model` is recorded next to every stored vector.
    pub fn new(db: Database, model: impl Into<String>) -> Self {
        Self {
            db,
            model: model.into(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Index(format!("index task failed: {}", e)))?
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        let db = self.db.clone();
        let model = self.model.clone();
        let chunks = chunks.to_vec();
        let embeddings = embeddings.to_vec();
        let stored = blocking(move || {
            db.upsert_embedded_chunks(&chunks, &embeddings, &model)
                .map_err(Error::from)
        })
        .await?;
        debug!("Stored {} embedded chunks", stored);
        Ok(stored)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        let db = self.db.clone();
        let query = query.to_vec();
        blocking(move || db.vector_search(&query, k, None).map_err(Error::from)).await
    }

    async fn search_within(
        &self,
        query: &[f32],
        k: usize,
        chunk_ids: &[ChunkId],
    ) -> Result<Vec<IndexMatch>> {
        let db = self.db.clone();
        let query = query.to_vec();
        let ids: HashSet<ChunkId> = chunk_ids.iter().cloned().collect();
        blocking(move || db.vector_search(&query, k, Some(&ids)).map_err(Error::from)).await
    }

    async fn remove_source(&self, location: &str) -> Result<usize> {
        let db = self.db.clone();
        let location = location.to_string();
        let removed =
            blocking(move || db.delete_chunks_by_source(&location).map_err(Error::from)).await?;
        if removed > 0 {
            debug!("Removed {} stale chunks", removed);
        }
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        let db = self.db.clone();
        blocking(move || db.embedded_count().map_err(Error::from)).await
    }
}
