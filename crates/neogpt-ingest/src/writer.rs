//! Embeds chunks and stores them in a vector index, one source at a time.

use neogpt_core::{Chunk, Embedder, VectorIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_BATCH_SIZE: usize = 32;

/// A source whose chunks did not reach the index.
#[derive(Debug)]
pub struct FailedWrite {
    pub location: String,
    pub chunk_count: usize,
    pub message: String,
}

/// What a write produced. A source either lands completely or not at all.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub stored: usize,
    pub failed: Vec<FailedWrite>,
    /// Set when the index or embedder stopped serving; every source after
    /// the one that hit it is listed in `failed` too.
    pub aborted: Option<String>,
}

#[derive(Clone)]
pub struct IndexWriter {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl IndexWriter {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed and store every chunk, grouped by source. A failing source is
    /// recorded and the rest continue; an unavailable collaborator stops the
    /// write.
    pub async fn write(&self, chunks: &[Chunk]) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        let groups = group_by_source(chunks);
        let total = groups.len();

        for (location, group) in groups {
            if let Some(reason) = &outcome.aborted {
                outcome.failed.push(FailedWrite {
                    location,
                    chunk_count: group.len(),
                    message: format!("not written: {}", reason),
                });
                continue;
            }

            match self.write_source(&location, &group).await {
                Ok(stored) => {
                    outcome.stored += stored;
                    debug!("Stored {} chunks for {}", stored, location);
                }
                Err(e) => {
                    warn!("Could not index {}: {}", location, e);
                    if e.is_unavailable() {
                        outcome.aborted = Some(e.to_string());
                    }
                    outcome.failed.push(FailedWrite {
                        location,
                        chunk_count: group.len(),
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Wrote {} chunks from {} sources ({} failed)",
            outcome.stored,
            total,
            outcome.failed.len()
        );
        outcome
    }

    /// Embed the whole source first so a failure leaves its previous chunks
    /// in place, then replace them.
    async fn write_source(&self, location: &str, chunks: &[Chunk]) -> neogpt_core::Result<usize> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            embeddings.extend(self.embedder.embed_batch(&texts).await?);
        }

        self.index.remove_source(location).await?;
        self.index.add(chunks, &embeddings).await
    }
}

/// Chunks grouped by source location, sources in first-seen order.
fn group_by_source(chunks: &[Chunk]) -> Vec<(String, Vec<Chunk>)> {
    let mut groups: Vec<(String, Vec<Chunk>)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for chunk in chunks {
        let slot = *slots.entry(chunk.source_location.as_str()).or_insert_with(|| {
            groups.push((chunk.source_location.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(chunk.clone());
    }
    groups
}
