//! Local retrieval followed by per-hit extraction of the relevant passages.

use crate::error::RetrieveResult;
use crate::request::{Hit, RetrievalOptions, RetrievalResult, StrategyName};
use crate::selector::Selector;
use crate::strategies::{local, NO_OUTPUT};
use futures_util::future::join_all;
use neogpt_core::Usage;
use tracing::debug;

pub(crate) fn extract_prompt(question: &str, context: &str) -> String {
    format!(
        "Given the following question and context, extract any part of the context *AS IS* \
         that is relevant to answer the question. If none of the context is relevant return {}.\n\n\
         > Question: {}\n\
         > Context:\n>>>\n{}\n>>>\n\
         Extracted relevant parts:",
        NO_OUTPUT, question, context
    )
}

fn is_empty_extraction(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.trim_matches('.').eq_ignore_ascii_case(NO_OUTPUT)
}

pub(crate) async fn run(
    selector: &Selector,
    query: &str,
    options: &RetrievalOptions,
) -> RetrieveResult<RetrievalResult> {
    let model = selector.model_for(StrategyName::Compress)?;
    let hits = local::search(selector, query, options.k).await?;

    let prompts: Vec<String> = hits
        .iter()
        .map(|hit| extract_prompt(query, &hit.content))
        .collect();
    let extractions = join_all(prompts.iter().map(|prompt| model.generate(prompt, None))).await;

    let mut usage = Usage::default();
    let mut kept = Vec::with_capacity(hits.len());
    for (hit, extraction) in hits.into_iter().zip(extractions) {
        let generation = extraction?;
        usage += generation.usage;
        if is_empty_extraction(&generation.text) {
            debug!("Dropped {} after compression", hit.chunk_ref);
            continue;
        }
        kept.push(Hit {
            content: generation.text.trim().to_string(),
            ..hit
        });
    }

    Ok(RetrievalResult::ranked(kept, options.k, usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::RetrievalRequest;

    #[test]
    fn test_empty_extraction() {
        assert!(is_empty_extraction(" NO_OUTPUT "));
        assert!(is_empty_extraction("no_output."));
        assert!(is_empty_extraction(""));
        assert!(!is_empty_extraction("Rust was started by Graydon Hoare."));
    }

    #[tokio::test]
    async fn test_drops_irrelevant_hits() {
        let kit = Kit::new();
        kit.seed(&[
            ("rust.md", "rust was started by graydon hoare. it has a mascot."),
            ("bread.md", "rust colored bread crust"),
        ])
        .await;
        kit.model.reply_when("graydon", "rust was started by graydon hoare.");
        kit.model.reply_when("bread", NO_OUTPUT);

        let result = kit
            .selector()
            .retrieve(&RetrievalRequest::new("who started rust", "compress"))
            .await
            .unwrap();

        assert_eq!(result.hits().len(), 1);
        assert_eq!(result.hits()[0].content, "rust was started by graydon hoare.");
        assert_eq!(result.usage().calls, 2);
    }
}
