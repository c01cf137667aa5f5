//! The SQLite index file.
//!
//! Besides the connection pool, a database remembers which embedding model
//! and vector width it was built with. Vectors from a different model are not
//! comparable by cosine similarity, so writes that would mix them are refused.

use crate::error::{DbError, DbResult};
use crate::migrations;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

pub type ConnectionPool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA foreign_keys = ON;";

/// Readers are the search paths plus the writer; ingestion writes from one task.
const FILE_POOL_SIZE: u32 = 4;

const MODEL_KEY: &str = "embedding_model";
const DIMENSIONS_KEY: &str = "embedding_dimensions";

/// Embedding model and vector width an index was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingProfile {
    pub model: String,
    pub dimensions: usize,
}

impl std::fmt::Display for EmbeddingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} dims)", self.model, self.dimensions)
    }
}

#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open (or create) the index file, creating its directory if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::Other(e.to_string()))?;
        }

        info!("Opening index database at: {}", path.display());
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch(FILE_PRAGMAS));
        Self::from_manager(manager, FILE_POOL_SIZE)
    }

    /// Private in-memory index. One connection, since each would see its own database.
    pub fn open_in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::from_manager(manager, 1)
    }

    fn from_manager(manager: SqliteConnectionManager, size: u32) -> DbResult<Self> {
        let pool = Pool::builder().max_size(size).build(manager)?;
        migrations::initialize_schema(&*pool.get()?)?;
        Ok(Self { pool })
    }

    pub fn conn(&self) -> DbResult<PooledConn> {
        self.pool.get().map_err(DbError::from)
    }

    /// The profile recorded by the first write, if any.
    pub fn embedding_profile(&self) -> DbResult<Option<EmbeddingProfile>> {
        read_profile(&*self.conn()?)
    }
}

fn read_meta(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM index_meta WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn read_profile(conn: &Connection) -> DbResult<Option<EmbeddingProfile>> {
    let model = read_meta(conn, MODEL_KEY)?;
    let dimensions = read_meta(conn, DIMENSIONS_KEY)?;
    match (model, dimensions) {
        (Some(model), Some(dimensions)) => {
            let dimensions = dimensions
                .parse()
                .map_err(|_| DbError::Other(format!("corrupt dimension count: {}", dimensions)))?;
            Ok(Some(EmbeddingProfile { model, dimensions }))
        }
        _ => Ok(None),
    }
}

/// Record `requested` on an empty index, or make sure it matches what is stored.
pub(crate) fn ensure_profile(conn: &Connection, requested: &EmbeddingProfile) -> DbResult<()> {
    match read_profile(conn)? {
        Some(stored) if stored == *requested => Ok(()),
        Some(stored) => Err(DbError::ProfileMismatch {
            stored: stored.to_string(),
            requested: requested.to_string(),
        }),
        None => {
            debug!("Recording embedding profile {}", requested);
            let mut stmt =
                conn.prepare("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)")?;
            stmt.execute(params![MODEL_KEY, requested.model])?;
            stmt.execute(params![DIMENSIONS_KEY, requested.dimensions.to_string()])?;
            Ok(())
        }
    }
}
