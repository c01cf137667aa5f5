//! Similarity search over the persisted index.

use crate::error::RetrieveResult;
use crate::request::{Hit, RetrievalOptions, RetrievalResult};
use crate::selector::Selector;
use neogpt_core::Usage;

pub(crate) async fn search(selector: &Selector, query: &str, k: usize) -> RetrieveResult<Vec<Hit>> {
    let vector = selector.embedder.embed(query).await?;
    let matches = selector.index.search(&vector, k).await?;
    Ok(matches.into_iter().map(Hit::from).collect())
}

pub(crate) async fn run(
    selector: &Selector,
    query: &str,
    options: &RetrievalOptions,
) -> RetrieveResult<RetrievalResult> {
    let hits = search(selector, query, options.k).await?;
    Ok(RetrievalResult::ranked(hits, options.k, Usage::default()))
}
