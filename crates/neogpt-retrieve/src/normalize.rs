//! Score normalization and source keys for merging result lists.

use crate::request::Hit;
use neogpt_ingest::normalize_url;

/// Min-max scale scores into `[0, 1]`. A list whose scores are all equal
/// maps to 1.0.
pub fn min_max(hits: &mut [Hit]) {
    let Some(first) = hits.first() else {
        return;
    };
    let (min, max) = hits.iter().fold((first.score, first.score), |(lo, hi), h| {
        (lo.min(h.score), hi.max(h.score))
    });
    let range = max - min;

    for hit in hits.iter_mut() {
        hit.score = if range > f32::EPSILON {
            (hit.score - min) / range
        } else {
            1.0
        };
    }
}

/// Key identifying "the same source" across local and web results.
pub fn source_key(location: &str) -> String {
    normalize_url(location).unwrap_or_else(|| location.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(scores: &[f32]) -> Vec<Hit> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| Hit {
                chunk_ref: i.to_string(),
                content: String::new(),
                score: *s,
                source_location: format!("s{}", i),
            })
            .collect()
    }

    #[test]
    fn test_min_max() {
        let mut hits = scored(&[0.2, 0.6, 0.4]);
        min_max(&mut hits);
        let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[1], 1.0);
        assert!((scores[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_equal_scores_become_one() {
        let mut hits = scored(&[0.3, 0.3]);
        min_max(&mut hits);
        assert!(hits.iter().all(|h| h.score == 1.0));

        let mut single = scored(&[-0.2]);
        min_max(&mut single);
        assert_eq!(single[0].score, 1.0);

        min_max(&mut []);
    }

    #[test]
    fn test_source_key() {
        assert_eq!(source_key("https://Example.com/docs/#a"), "https://example.com/docs");
        assert_eq!(source_key("docs/guide.md"), "docs/guide.md");
    }
}
