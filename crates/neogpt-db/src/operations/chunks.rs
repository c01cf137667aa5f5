//! Chunk and embedding persistence.

use crate::database::{ensure_profile, Database, EmbeddingProfile};
use crate::error::{DbError, DbResult};
use chrono::Utc;
use neogpt_core::{Chunk, Language};
use rusqlite::{params, Row};

pub(crate) const CHUNK_COLUMNS: &str =
    "c.id, c.source_location, c.sequence, c.content, c.language, c.metadata";

/// Map a row selected with [`CHUNK_COLUMNS`] to a chunk.
pub(crate) fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let language: Option<String> = row.get(4)?;
    let metadata: String = row.get(5)?;
    Ok(Chunk {
        id: row.get(0)?,
        source_location: row.get(1)?,
        sequence: row.get(2)?,
        content: row.get(3)?,
        language: language.and_then(|l| parse_language(&l)),
        metadata: serde_json::from_str(&metadata).unwrap_or_else(|_| serde_json::json!({})),
    })
}

fn parse_language(tag: &str) -> Option<Language> {
    serde_json::from_value(serde_json::Value::String(tag.to_string())).ok()
}

pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn decode_vector(bytes: &[u8], dimensions: usize) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .take(dimensions)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl Database {
    /// Insert or replace chunks together with their embeddings in one transaction.
    pub fn upsert_embedded_chunks(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
        model: &str,
    ) -> DbResult<usize> {
        if chunks.len() != embeddings.len() {
            return Err(DbError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let Some(first) = embeddings.first() else {
            return Ok(0);
        };
        let dimensions = first.len();
        if let Some(odd) = embeddings.iter().find(|v| v.len() != dimensions) {
            return Err(DbError::ProfileMismatch {
                stored: format!("{} ({} dims)", model, dimensions),
                requested: format!("{} ({} dims)", model, odd.len()),
            });
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_profile(
            &tx,
            &EmbeddingProfile {
                model: model.to_string(),
                dimensions,
            },
        )?;
        let now = Utc::now().to_rfc3339();

        {
            let mut chunk_stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO chunks
                    (id, source_location, sequence, content, language, metadata, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            let mut embedding_stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO embeddings (chunk_id, vector, model, dimensions)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;

            for (chunk, vector) in chunks.iter().zip(embeddings) {
                chunk_stmt.execute(params![
                    chunk.id,
                    chunk.source_location,
                    chunk.sequence,
                    chunk.content,
                    chunk.language.map(|l| l.as_str()),
                    serde_json::to_string(&chunk.metadata)?,
                    now,
                ])?;
                embedding_stmt.execute(params![
                    chunk.id,
                    encode_vector(vector),
                    model,
                    vector.len() as i64,
                ])?;
            }
        }

        tx.commit()?;
        Ok(chunks.len())
    }

    /// Remove every chunk of a source. Embeddings cascade.
    pub fn delete_chunks_by_source(&self, source_location: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM chunks WHERE source_location = ?1",
            params![source_location],
        )?;
        Ok(count)
    }

    /// Number of chunks that carry an embedding.
    pub fn embedded_count(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_rows(db: &Database, source: &str) -> Vec<(u32, String)> {
        let conn = db.conn().unwrap();
        let mut stmt = conn
            .prepare("SELECT sequence, content FROM chunks WHERE source_location = ?1 ORDER BY sequence")
            .unwrap();
        let rows = stmt
            .query_map(params![source], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_upsert_stores_chunks_and_vectors() {
        let db = Database::open_in_memory().unwrap();

        let chunk1 = Chunk::new("notes.md", 0, "First chunk content");
        let chunk2 = Chunk::new("notes.md", 1, "Second chunk content")
            .with_language(Some(Language::Markdown));

        let stored = db
            .upsert_embedded_chunks(&[chunk1, chunk2], &[vec![1.0, 0.0], vec![0.0, 1.0]], "test-model")
            .unwrap();
        assert_eq!(stored, 2);
        assert_eq!(db.embedded_count().unwrap(), 2);
        assert_eq!(
            chunk_rows(&db, "notes.md"),
            vec![
                (0, "First chunk content".to_string()),
                (1, "Second chunk content".to_string())
            ]
        );
        assert_eq!(db.embedding_profile().unwrap().unwrap().dimensions, 2);
    }

    #[test]
    fn test_reingest_replaces() {
        let db = Database::open_in_memory().unwrap();

        let first = Chunk::new("a.txt", 0, "old text");
        db.upsert_embedded_chunks(&[first], &[vec![1.0]], "m").unwrap();

        let second = Chunk::new("a.txt", 0, "new text");
        db.upsert_embedded_chunks(&[second], &[vec![0.5]], "m").unwrap();

        assert_eq!(chunk_rows(&db, "a.txt"), vec![(0, "new text".to_string())]);
        assert_eq!(db.embedded_count().unwrap(), 1);
    }

    #[test]
    fn test_length_mismatch() {
        let db = Database::open_in_memory().unwrap();
        let result = db.upsert_embedded_chunks(&[Chunk::new("a", 0, "x")], &[], "m");
        assert!(matches!(result, Err(DbError::LengthMismatch { .. })));
    }

    #[test]
    fn test_mixed_widths_and_models_refused() {
        let db = Database::open_in_memory().unwrap();
        let ragged = db.upsert_embedded_chunks(
            &[Chunk::new("a", 0, "x"), Chunk::new("a", 1, "y")],
            &[vec![1.0, 0.0], vec![1.0]],
            "m",
        );
        assert!(matches!(ragged, Err(DbError::ProfileMismatch { .. })));
        assert_eq!(db.embedded_count().unwrap(), 0);

        db.upsert_embedded_chunks(&[Chunk::new("a", 0, "x")], &[vec![1.0, 0.0]], "m")
            .unwrap();
        let other_model =
            db.upsert_embedded_chunks(&[Chunk::new("b", 0, "z")], &[vec![0.0, 1.0]], "other");
        assert!(matches!(other_model, Err(DbError::ProfileMismatch { .. })));
        assert!(chunk_rows(&db, "b").is_empty());
    }

    #[test]
    fn test_delete_by_source_cascades() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_embedded_chunks(
            &[Chunk::new("a.txt", 0, "one"), Chunk::new("a.txt", 1, "two"), Chunk::new("b.txt", 0, "three")],
            &[vec![0.1, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]],
            "test-model",
        )
        .unwrap();

        assert_eq!(db.delete_chunks_by_source("a.txt").unwrap(), 2);
        assert_eq!(db.embedded_count().unwrap(), 1);
        assert!(chunk_rows(&db, "a.txt").is_empty());
        assert_eq!(db.delete_chunks_by_source("a.txt").unwrap(), 0);
    }
}
