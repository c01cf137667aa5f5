//! Non-persistent `VectorIndex`.

use crate::operations::vectors::rank_matches;
use async_trait::async_trait;
use neogpt_core::similarity::cosine_similarity;
use neogpt_core::{Chunk, ChunkId, Error, IndexMatch, Result, VectorIndex};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct Entries {
    rows: Vec<(Chunk, Vec<f32>)>,
    /// Chunk id to its position in `rows`.
    positions: HashMap<ChunkId, usize>,
}

impl Entries {
    fn upsert(&mut self, chunk: &Chunk, vector: &[f32]) {
        match self.positions.get(&chunk.id) {
            Some(&at) => self.rows[at] = (chunk.clone(), vector.to_vec()),
            None => {
                self.positions.insert(chunk.id.clone(), self.rows.len());
                self.rows.push((chunk.clone(), vector.to_vec()));
            }
        }
    }

    fn remove_source(&mut self, location: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|(chunk, _)| chunk.source_location != location);
        let removed = before - self.rows.len();
        if removed > 0 {
            self.positions = self
                .rows
                .iter()
                .enumerate()
                .map(|(at, (chunk, _))| (chunk.id.clone(), at))
                .collect();
        }
        removed
    }
}

/// Keeps chunks and vectors in insertion order; re-adding a chunk id replaces it.
#[derive(Default)]
pub struct InMemoryIndex {
    entries: RwLock<Entries>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    async fn scored(&self, query: &[f32], k: usize, within: Option<HashSet<&str>>) -> Vec<IndexMatch> {
        let entries = self.entries.read().await;
        let matches = entries
            .rows
            .iter()
            .filter(|(chunk, _)| within.as_ref().map_or(true, |ids| ids.contains(chunk.id.as_str())))
            .map(|(chunk, vector)| IndexMatch {
                chunk: chunk.clone(),
                score: cosine_similarity(query, vector),
            })
            .collect();
        rank_matches(matches, k)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(Error::Index(format!(
                "Embedding count {} does not match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut entries = self.entries.write().await;
        for (chunk, vector) in chunks.iter().zip(embeddings) {
            entries.upsert(chunk, vector);
        }
        Ok(chunks.len())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        Ok(self.scored(query, k, None).await)
    }

    async fn search_within(
        &self,
        query: &[f32],
        k: usize,
        chunk_ids: &[ChunkId],
    ) -> Result<Vec<IndexMatch>> {
        let ids = chunk_ids.iter().map(String::as_str).collect();
        Ok(self.scored(query, k, Some(ids)).await)
    }

    async fn remove_source(&self, location: &str) -> Result<usize> {
        Ok(self.entries.write().await.remove_source(location))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_on_same_id() {
        let index = InMemoryIndex::new();
        index
            .add(&[Chunk::new("a", 0, "old")], &[vec![1.0, 0.0]])
            .await
            .unwrap();
        index
            .add(&[Chunk::new("a", 0, "new")], &[vec![0.0, 1.0]])
            .await
            .unwrap();

        assert_eq!(index.len().await.unwrap(), 1);
        let hits = index.search(&[0.0, 1.0], 4).await.unwrap();
        assert_eq!(hits[0].chunk.content, "new");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_within_and_k() {
        let index = InMemoryIndex::new();
        let chunks: Vec<Chunk> = (0..4).map(|i| Chunk::new("doc", i, format!("part {}", i))).collect();
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.0, 1.0],
        ];
        index.add(&chunks, &vectors).await.unwrap();

        let top = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].chunk.sequence, 0);

        let restricted = index
            .search_within(&[1.0, 0.0], 2, &[chunks[2].id.clone(), chunks[3].id.clone()])
            .await
            .unwrap();
        assert_eq!(restricted[0].chunk.sequence, 2);
        assert_eq!(restricted[1].chunk.sequence, 3);
    }

    #[tokio::test]
    async fn test_bulk_add_then_replace_after_removal() {
        let index = InMemoryIndex::new();
        let chunks: Vec<Chunk> = (0..2000)
            .map(|i| Chunk::new(if i % 2 == 0 { "even" } else { "odd" }, i, format!("c{}", i)))
            .collect();
        let vectors = vec![vec![1.0, 0.0]; chunks.len()];
        index.add(&chunks, &vectors).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 2000);

        assert_eq!(index.remove_source("even").await.unwrap(), 1000);
        assert_eq!(index.len().await.unwrap(), 1000);

        let replaced = Chunk::new("odd", 1999, "replaced");
        index.add(&[replaced], &[vec![0.0, 1.0]]).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1000);

        let hits = index.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].chunk.content, "replaced");
    }
}
