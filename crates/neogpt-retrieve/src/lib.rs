//! NeoGPT Retrieve - picks and runs a retrieval strategy for a question.
//!
//! Strategies: `local` (vector index), `web` (live search), `hybrid` (both,
//! merged per source), `stepback` (broader question narrows candidates),
//! `sql` (generated SELECT over a SQLite file) and `compress` (local hits
//! reduced to their relevant passages).

mod answer;
mod error;
mod normalize;
mod request;
mod search;
mod selector;
mod strategies;

#[cfg(test)]
pub(crate) mod testing;

pub use answer::{
    answer, build_answer_prompt, source_references, truncate_content, Answer, SourceReference,
    ANSWER_SYSTEM_PROMPT,
};
pub use error::{RetrieveError, RetrieveResult};
pub use normalize::{min_max, source_key};
pub use request::{Hit, RetrievalOptions, RetrievalRequest, RetrievalResult, StrategyName};
pub use search::{parse_results, DuckDuckGoSearch};
pub use selector::{Selector, SelectorSettings};
pub use strategies::NO_OUTPUT;
