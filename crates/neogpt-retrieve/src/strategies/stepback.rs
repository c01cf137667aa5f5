//! Step-back retrieval: a broader question selects the candidate pool, the
//! original question ranks within it.

use crate::error::RetrieveResult;
use crate::request::{Hit, RetrievalOptions, RetrievalResult, StrategyName};
use crate::selector::Selector;
use crate::strategies::first_line;
use neogpt_core::ChunkId;
use tracing::debug;

const STEPBACK_SYSTEM: &str = "You are an expert at world knowledge. Your task is to step back \
and paraphrase a question to a more generic step-back question, which is easier to answer. \
Reply with the step-back question only.";

pub(crate) fn stepback_prompt(question: &str) -> String {
    format!(
        "Examples:\n\
         Original question: Could the members of The Police perform lawful arrests?\n\
         Step-back question: What can the members of The Police do?\n\n\
         Original question: Jan Sindel's was born in what country?\n\
         Step-back question: What is Jan Sindel's personal history?\n\n\
         Original question: {}\n\
         Step-back question:",
        question
    )
}

pub(crate) async fn run(
    selector: &Selector,
    query: &str,
    options: &RetrievalOptions,
) -> RetrieveResult<RetrievalResult> {
    let model = selector.model_for(StrategyName::Stepback)?;

    let generation = model.generate(&stepback_prompt(query), Some(STEPBACK_SYSTEM)).await?;
    let broader = match first_line(&generation.text) {
        "" => query,
        line => line,
    };
    debug!("Step-back question: {}", broader);

    let broad_vector = selector.embedder.embed(broader).await?;
    let candidates = selector
        .index
        .search(&broad_vector, options.candidate_k())
        .await?;
    if candidates.is_empty() {
        return Ok(RetrievalResult::ranked(Vec::new(), options.k, generation.usage));
    }
    let ids: Vec<ChunkId> = candidates.into_iter().map(|m| m.chunk.id).collect();

    let vector = selector.embedder.embed(query).await?;
    let matches = selector.index.search_within(&vector, options.k, &ids).await?;
    let hits = matches.into_iter().map(Hit::from).collect();

    Ok(RetrievalResult::ranked(hits, options.k, generation.usage))
}
