//! The six retrieval algorithms. Each exposes `run(selector, query, options)`.

pub(crate) mod compress;
pub(crate) mod hybrid;
pub(crate) mod local;
pub(crate) mod sql;
pub(crate) mod stepback;
pub(crate) mod web;

/// Prompt output marker meaning "nothing relevant".
pub const NO_OUTPUT: &str = "NO_OUTPUT";

/// First non-empty line of a model reply, without surrounding quotes.
pub(crate) fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .trim_matches(|c| c == '"' || c == '\'')
}
