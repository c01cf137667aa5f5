//! Live web search: fetch result pages, chunk them, score against the query.

use crate::error::RetrieveResult;
use crate::request::{Hit, RetrievalOptions, RetrievalResult, StrategyName};
use crate::selector::Selector;
use futures_util::future::join_all;
use neogpt_core::similarity::cosine_similarity;
use neogpt_core::{Chunk, Usage};
use neogpt_ingest::loaders::html_to_text;
use neogpt_ingest::Chunker;
use tracing::{debug, warn};

pub(crate) async fn search(selector: &Selector, query: &str, k: usize) -> RetrieveResult<Vec<Hit>> {
    let web = selector.web_for(StrategyName::Web)?;
    let urls = web.search.search(query, selector.settings.web_results).await?;
    debug!("Web search returned {} results", urls.len());
    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let pages = join_all(urls.iter().map(|url| web.fetcher.fetch(url))).await;

    let chunker = Chunker::new(selector.settings.chunking.clone());
    let mut chunks = Vec::new();
    for (url, page) in urls.iter().zip(pages) {
        match page {
            Ok(html) => {
                let (text, _) = html_to_text(&html);
                for (seq, piece) in chunker.split_text(&text).into_iter().enumerate() {
                    chunks.push(Chunk::new(url.as_str(), seq as u32, piece));
                }
            }
            Err(e) => warn!("Skipping web result {}: {}", url, e),
        }
    }
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let query_vector = selector.embedder.embed(query).await?;
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = selector.embedder.embed_batch(&texts).await?;

    let mut hits: Vec<Hit> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| Hit {
            score: cosine_similarity(&query_vector, &vector),
            chunk_ref: chunk.id,
            content: chunk.content,
            source_location: chunk.source_location,
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);
    Ok(hits)
}

pub(crate) async fn run(
    selector: &Selector,
    query: &str,
    options: &RetrievalOptions,
) -> RetrieveResult<RetrievalResult> {
    let hits = search(selector, query, options.k).await?;
    Ok(RetrievalResult::ranked(hits, options.k, Usage::default()))
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use crate::RetrievalRequest;

    #[tokio::test]
    async fn test_web_scores_fetched_pages() {
        let kit = Kit::new();
        kit.search.set(&["https://a.test/", "https://b.test/", "https://down.test/"]);
        kit.fetcher.serve("https://a.test/", "<p>Rust borrow checker explained</p>");
        kit.fetcher.serve("https://b.test/", "<p>Gardening tips for spring</p>");

        let result = kit
            .selector()
            .retrieve(&RetrievalRequest::new("borrow checker", "web"))
            .await
            .unwrap();

        assert_eq!(result.hits().len(), 2);
        assert_eq!(result.hits()[0].source_location, "https://a.test/");
        assert_eq!(result.hits()[0].content, "Rust borrow checker explained");
        assert_eq!(kit.fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_no_results() {
        let kit = Kit::new();
        let result = kit
            .selector()
            .retrieve(&RetrievalRequest::new("anything", "web"))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(kit.fetcher.calls(), 0);
    }
}
