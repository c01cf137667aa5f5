//! Natural-language questions over tabular data through one generated SELECT.

use crate::error::{RetrieveError, RetrieveResult};
use crate::request::{Hit, RetrievalOptions, RetrievalResult, StrategyName};
use crate::selector::Selector;
use neogpt_core::{chunk_id, TableRows, TableSchema};
use tracing::{debug, warn};

const SQL_SYSTEM: &str = "You translate questions into SQLite queries. Reply with exactly one \
SELECT statement and nothing else.";

pub(crate) fn sql_prompt(question: &str, schemas: &[TableSchema], limit: usize) -> String {
    let tables = schemas
        .iter()
        .map(|s| format!("- {}", s.describe()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Tables:\n{}\n\n\
         Write one SQLite SELECT statement that answers the question. \
         Return at most {} rows. Only use the tables and columns listed.\n\n\
         Question: {}\n\
         SQL:",
        tables, limit, question
    )
}

/// Pull the statement out of a reply that may carry code fences or a label.
pub(crate) fn extract_sql(reply: &str) -> String {
    let mut text = reply.trim();

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("sqlite").or_else(|| after.strip_prefix("sql")).unwrap_or(after);
        text = match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        };
    }

    let text = text.trim();
    let text = text
        .strip_prefix("SQL:")
        .or_else(|| text.strip_prefix("sql:"))
        .unwrap_or(text)
        .trim();

    let statement = match text.find(';') {
        Some(end) => &text[..end],
        None => text,
    };
    statement.trim().to_string()
}

fn is_select(sql: &str) -> bool {
    let first = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    first == "SELECT" || first == "WITH"
}

fn rows_to_hits(sql: &str, rows: TableRows) -> Vec<Hit> {
    let source = format!("sql:{}", sql);
    rows.rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let content = rows
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| format!("{}: {}", column, value))
                .collect::<Vec<_>>()
                .join(", ");
            Hit {
                chunk_ref: chunk_id(&source, i as u32),
                content,
                score: 1.0,
                source_location: source.clone(),
            }
        })
        .collect()
}

pub(crate) async fn run(
    selector: &Selector,
    query: &str,
    options: &RetrievalOptions,
) -> RetrieveResult<RetrievalResult> {
    let model = selector.model_for(StrategyName::Sql)?;
    let tables = selector.tables_for(StrategyName::Sql)?;

    let schemas = tables.schemas().await?;
    if schemas.is_empty() {
        warn!("Table store has no tables");
        return Ok(RetrievalResult::empty());
    }

    let generation = model
        .generate(&sql_prompt(query, &schemas, options.k), Some(SQL_SYSTEM))
        .await?;
    let sql = extract_sql(&generation.text);
    if !is_select(&sql) {
        return Err(RetrieveError::NotSelect(sql));
    }
    debug!("Generated SQL: {}", sql);

    let rows = tables.query(&sql).await?;
    Ok(RetrievalResult::ranked(
        rows_to_hits(&sql, rows),
        options.k,
        generation.usage,
    ))
}
