//! Database error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Only a single read-only SELECT statement is allowed: {0}")]
    NotReadOnly(String),

    #[error("Index was built with {stored}; refusing vectors from {requested}")]
    ProfileMismatch { stored: String, requested: String },

    #[error("Embedding count {embeddings} does not match chunk count {chunks}")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("Database error: {0}")]
    Other(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for neogpt_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotReadOnly(_) => neogpt_core::Error::InvalidInput(err.to_string()),
            DbError::ProfileMismatch { .. } | DbError::Pool(_) => {
                neogpt_core::Error::Unavailable(err.to_string())
            }
            other => neogpt_core::Error::Index(other.to_string()),
        }
    }
}
