//! Brute-force vector search.

use crate::database::Database;
use crate::error::DbResult;
use crate::operations::chunks::{chunk_from_row, decode_vector, CHUNK_COLUMNS};
use neogpt_core::similarity::cosine_similarity;
use neogpt_core::{ChunkId, IndexMatch};
use std::collections::HashSet;

/// Sort matches best first, keeping insertion order between equal scores, and keep `k`.
pub fn rank_matches(mut matches: Vec<IndexMatch>, k: usize) -> Vec<IndexMatch> {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(k);
    matches
}

impl Database {
    /// Find similar chunks using cosine similarity.
    ///
    /// This performs a brute-force search over all embeddings, which is
    /// efficient for local indexes (<100K chunks). When `within` is given,
    /// only those chunk ids are scored.
    pub fn vector_search(
        &self,
        query_vector: &[f32],
        k: usize,
        within: Option<&HashSet<ChunkId>>,
    ) -> DbResult<Vec<IndexMatch>> {
        let conn = self.conn()?;

        let sql = format!(
            r#"
            SELECT {}, e.vector, e.dimensions
            FROM embeddings e
            JOIN chunks c ON c.id = e.chunk_id
            ORDER BY c.source_location, c.sequence
            "#,
            CHUNK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map([], |row| {
            let chunk = chunk_from_row(row)?;
            let vector_bytes: Vec<u8> = row.get(6)?;
            let dimensions: i64 = row.get(7)?;
            Ok((chunk, vector_bytes, dimensions))
        })?;

        let mut results = Vec::new();
        for row_result in rows {
            let (chunk, vector_bytes, dimensions) = row_result?;
            if let Some(ids) = within {
                if !ids.contains(&chunk.id) {
                    continue;
                }
            }

            let vector = decode_vector(&vector_bytes, dimensions as usize);
            let score = cosine_similarity(query_vector, &vector);
            results.push(IndexMatch { chunk, score });
        }

        Ok(rank_matches(results, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neogpt_core::Chunk;

    fn seeded() -> (Database, Chunk, Chunk) {
        let db = Database::open_in_memory().unwrap();
        let chunk1 = Chunk::new("rust.md", 0, "First chunk about Rust programming");
        let chunk2 = Chunk::new("python.md", 0, "Second chunk about Python");
        db.upsert_embedded_chunks(
            &[chunk1.clone(), chunk2.clone()],
            &[vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]],
            "test-model",
        )
        .unwrap();
        (db, chunk1, chunk2)
    }

    #[test]
    fn test_vector_search() {
        let (db, chunk1, _) = seeded();

        let query = vec![0.9, 0.1, 0.0, 0.0];
        let results = db.vector_search(&query, 10, None).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, chunk1.id);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_vector_search_within() {
        let (db, _, chunk2) = seeded();

        let ids: HashSet<ChunkId> = [chunk2.id.clone()].into_iter().collect();
        let results = db
            .vector_search(&[0.9, 0.1, 0.0, 0.0], 10, Some(&ids))
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, chunk2.id);
    }

    #[test]
    fn test_rank_matches_is_stable() {
        let matches = vec![
            IndexMatch { chunk: Chunk::new("a", 0, "a"), score: 0.5 },
            IndexMatch { chunk: Chunk::new("b", 0, "b"), score: 0.9 },
            IndexMatch { chunk: Chunk::new("c", 0, "c"), score: 0.5 },
        ];
        let ranked = rank_matches(matches, 3);
        let order: Vec<&str> = ranked.iter().map(|m| m.chunk.source_location.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }
}
