//! NeoGPT DB - Vector storage and tabular data access using SQLite.

mod database;
mod error;
mod index;
mod memory;
mod migrations;
mod operations;
mod tables;

pub use database::{Database, EmbeddingProfile};
pub use error::{DbError, DbResult};
pub use index::SqliteIndex;
pub use memory::InMemoryIndex;
pub use operations::vectors::rank_matches;
pub use tables::{is_select_statement, SqliteTables};
