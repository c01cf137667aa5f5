//! Read-only access to a user's SQLite database for tabular questions.

use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use neogpt_core::{Error, Result, TableRows, TableSchema, TableStore};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether `sql` is a single `SELECT` (or `WITH ... SELECT`) statement.
pub fn is_select_statement(sql: &str) -> bool {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() || trimmed.contains(';') {
        return false;
    }
    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    first == "SELECT" || first == "WITH"
}

/// A SQLite file opened read-only on every call.
#[derive(Debug, Clone)]
pub struct SqliteTables {
    path: PathBuf,
}

impl SqliteTables {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> DbResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Every user table with its column names.
    pub fn list_schemas(&self) -> DbResult<Vec<TableSchema>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut schemas = Vec::with_capacity(names.len());
        for name in names {
            let mut info = conn.prepare(&format!("PRAGMA table_info(\"{}\")", name.replace('"', "\"\"")))?;
            let columns = info
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            schemas.push(TableSchema { name, columns });
        }
        Ok(schemas)
    }

    /// Run a single read-only query and render every value as text.
    pub fn run_select(&self, sql: &str) -> DbResult<TableRows> {
        if !is_select_statement(sql) {
            return Err(DbError::NotReadOnly(sql.trim().to_string()));
        }

        let conn = self.open()?;
        let mut stmt = conn.prepare(sql.trim().trim_end_matches(';'))?;
        if !stmt.readonly() {
            return Err(DbError::NotReadOnly(sql.trim().to_string()));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();
        debug!("Running table query with {} columns", width);

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(render_value(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(TableRows { columns, rows })
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

#[async_trait]
impl TableStore for SqliteTables {
    async fn schemas(&self) -> Result<Vec<TableSchema>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.list_schemas().map_err(Error::from))
            .await
            .map_err(|e| Error::Index(format!("table task failed: {}", e)))?
    }

    async fn query(&self, sql: &str) -> Result<TableRows> {
        let store = self.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || store.run_select(&sql).map_err(Error::from))
            .await
            .map_err(|e| Error::Index(format!("table task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db() -> (tempfile::TempDir, SqliteTables) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE orders (id INTEGER PRIMARY KEY, customer TEXT, total REAL);
            INSERT INTO orders (customer, total) VALUES ('ada', 12.5), ('grace', 40.0);
            "#,
        )
        .unwrap();
        (dir, SqliteTables::new(path))
    }

    #[test]
    fn test_is_select_statement() {
        assert!(is_select_statement("SELECT * FROM t"));
        assert!(is_select_statement("  select 1;  "));
        assert!(is_select_statement("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_select_statement("DELETE FROM t"));
        assert!(!is_select_statement("SELECT 1; DROP TABLE t"));
        assert!(!is_select_statement(""));
    }

    #[test]
    fn test_schemas() {
        let (_dir, tables) = sample_db();
        let schemas = tables.list_schemas().unwrap();

        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].describe(), "orders(id, customer, total)");
    }

    #[tokio::test]
    async fn test_query_rows() {
        let (_dir, tables) = sample_db();
        let rows = tables
            .query("SELECT customer, total FROM orders ORDER BY total DESC")
            .await
            .unwrap();

        assert_eq!(rows.columns, vec!["customer", "total"]);
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[0], vec!["grace".to_string(), "40".to_string()]);
    }

    #[tokio::test]
    async fn test_refuses_writes() {
        let (_dir, tables) = sample_db();
        let err = tables.query("DELETE FROM orders").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let rows = tables.query("SELECT COUNT(*) FROM orders").await.unwrap();
        assert_eq!(rows.rows[0][0], "2");
    }
}
