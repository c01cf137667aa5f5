//! Local and web retrieval merged by source.

use crate::error::RetrieveResult;
use crate::normalize::{min_max, source_key};
use crate::request::{Hit, RetrievalOptions, RetrievalResult, StrategyName};
use crate::selector::Selector;
use crate::strategies::{local, web};
use neogpt_core::Usage;
use std::collections::HashMap;
use tracing::warn;

/// Best hit per source key, in first-seen order.
fn best_per_source(hits: Vec<Hit>) -> Vec<(String, Hit)> {
    let mut order: Vec<(String, Hit)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for hit in hits {
        let key = source_key(&hit.source_location);
        match position.get(&key) {
            Some(&i) => {
                if hit.score > order[i].1.score {
                    order[i].1 = hit;
                }
            }
            None => {
                position.insert(key.clone(), order.len());
                order.push((key, hit));
            }
        }
    }
    order
}

/// Union two normalized lists by source. The combined score is
/// `weight * local + (1 - weight) * web`, a missing side counting as 0.
pub(crate) fn merge(local: Vec<Hit>, web: Vec<Hit>, weight: f32) -> Vec<Hit> {
    struct Entry {
        hit: Hit,
        local: f32,
        web: f32,
    }

    let mut entries: Vec<Entry> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for (key, hit) in best_per_source(local) {
        position.insert(key, entries.len());
        entries.push(Entry {
            local: hit.score,
            web: 0.0,
            hit,
        });
    }

    for (key, hit) in best_per_source(web) {
        match position.get(&key) {
            Some(&i) => {
                let entry = &mut entries[i];
                if hit.score > entry.local {
                    entry.web = hit.score;
                    entry.hit = hit;
                } else {
                    entry.web = hit.score;
                }
            }
            None => {
                position.insert(key, entries.len());
                entries.push(Entry {
                    local: 0.0,
                    web: hit.score,
                    hit,
                });
            }
        }
    }

    entries
        .into_iter()
        .map(|e| Hit {
            score: weight * e.local + (1.0 - weight) * e.web,
            ..e.hit
        })
        .collect()
}

pub(crate) async fn run(
    selector: &Selector,
    query: &str,
    options: &RetrievalOptions,
) -> RetrieveResult<RetrievalResult> {
    selector.web_for(StrategyName::Hybrid)?;

    let (local_hits, web_hits) = tokio::join!(
        local::search(selector, query, options.k),
        web::search(selector, query, options.k)
    );

    let mut local_hits = local_hits?;
    let mut web_hits = web_hits.unwrap_or_else(|e| {
        warn!("Web side of hybrid retrieval failed, using local results only: {}", e);
        Vec::new()
    });

    min_max(&mut local_hits);
    min_max(&mut web_hits);

    let merged = merge(local_hits, web_hits, selector.settings.hybrid_weight);
    Ok(RetrievalResult::ranked(merged, options.k, Usage::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::RetrievalRequest;

    fn hit(id: &str, score: f32, source: &str) -> Hit {
        Hit {
            chunk_ref: id.to_string(),
            content: id.to_string(),
            score,
            source_location: source.to_string(),
        }
    }

    #[test]
    fn test_merge_unions_by_normalized_source() {
        let local = vec![
            hit("A", 1.0, "https://a.test/one"),
            hit("B", 0.0, "https://b.test/two/"),
        ];
        let web = vec![
            hit("B'", 1.0, "https://B.test/two#frag"),
            hit("C", 0.0, "https://c.test/"),
        ];

        let merged = merge(local, web, 0.5);
        let result = RetrievalResult::ranked(merged, 10, Usage::default());
        let ids: Vec<&str> = result.hits().iter().map(|h| h.chunk_ref.as_str()).collect();

        assert_eq!(result.hits().len(), 3);
        assert_eq!(result.sources().len(), 3);
        // A = 0.5, B' = 0.5 * 0 + 0.5 * 1 = 0.5, C = 0
        assert_eq!(ids, vec!["A", "B'", "C"]);
        assert_eq!(result.hits()[2].score, 0.0);
    }

    #[test]
    fn test_merge_keeps_best_chunk_per_source() {
        let local = vec![hit("A1", 0.2, "doc.md"), hit("A2", 0.9, "doc.md")];
        let merged = merge(local, vec![], 1.0);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].chunk_ref, "A2");
        assert!((merged[0].score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hybrid_end_to_end() {
        let kit = Kit::new();
        kit.seed(&[
            ("https://shared.test/page", "rust async runtimes"),
            ("notes/local.md", "rust async await"),
        ])
        .await;
        kit.search.set(&["https://shared.test/page/", "https://web-only.test/"]);
        kit.fetcher.serve("https://shared.test/page/", "<p>rust async executors</p>");
        kit.fetcher.serve("https://web-only.test/", "<p>tokio rust async</p>");

        let result = kit
            .selector()
            .retrieve(&RetrievalRequest::new("rust async", "hybrid").with_k(10))
            .await
            .unwrap();

        assert_eq!(result.sources().len(), 3);
        let keys: Vec<String> = result.hits().iter().map(|h| source_key(&h.source_location)).collect();
        let unique: std::collections::HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert!(result
            .hits()
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_web_failure_degrades_to_local() {
        let kit = Kit::new();
        kit.seed(&[("notes/local.md", "rust async await")]).await;
        kit.search.fail();

        let result = kit
            .selector()
            .retrieve(&RetrievalRequest::new("rust async", "hybrid"))
            .await
            .unwrap();

        assert_eq!(result.hits().len(), 1);
        assert_eq!(result.hits()[0].source_location, "notes/local.md");
    }
}
