//! Web search through the DuckDuckGo HTML endpoint.

use async_trait::async_trait;
use neogpt_core::{Error, Fetcher, Result, WebSearch};
use regex::Regex;
use reqwest::Url;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::debug;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

struct ResultPatterns {
    anchor: Regex,
    href: Regex,
}

static PATTERNS: OnceLock<ResultPatterns> = OnceLock::new();

fn patterns() -> &'static ResultPatterns {
    PATTERNS.get_or_init(|| ResultPatterns {
        anchor: Regex::new(r#"(?i)<a\s[^>]*class\s*=\s*"[^"]*\bresult__a\b[^"]*"[^>]*>"#)
            .expect("result anchor regex must compile"),
        href: Regex::new(r#"(?i)\bhref\s*=\s*"([^"]+)""#).expect("href regex must compile"),
    })
}

/// Result URLs from a DuckDuckGo HTML page, unwrapped from the redirect link.
pub fn parse_results(html: &str, limit: usize) -> Vec<String> {
    let patterns = patterns();
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for anchor in patterns.anchor.find_iter(html) {
        if urls.len() >= limit {
            break;
        }
        let Some(href) = patterns.href.captures(anchor.as_str()).and_then(|c| c.get(1)) else {
            continue;
        };
        if let Some(url) = unwrap_redirect(href.as_str()) {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }
    urls
}

fn unwrap_redirect(href: &str) -> Option<String> {
    let href = href.replace("&amp;", "&");
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href
    };
    let url = Url::parse(&absolute).ok()?;

    let target = if url.path().starts_with("/l/") {
        let (_, value) = url.query_pairs().find(|(key, _)| key == "uddg")?;
        Url::parse(&value).ok()?
    } else {
        url
    };

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

/// [`WebSearch`] backed by DuckDuckGo; pages are fetched with the shared fetcher.
pub struct DuckDuckGoSearch {
    fetcher: Arc<dyn Fetcher>,
}

impl DuckDuckGoSearch {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = Url::parse_with_params(SEARCH_ENDPOINT, &[("q", query.trim())])
            .map_err(|e| Error::InvalidInput(format!("search query: {}", e)))?;

        let html = self.fetcher.fetch(url.as_str()).await?;
        let results = parse_results(&html, limit);
        debug!("Search for '{}' found {} results", query, results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdoc.rust-lang.org%2Fbook%2F&amp;rut=abc">The Book</a>
          <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fignored.test%2F">snippet</a>
        </div>
        <div class="result">
          <a href="https://blog.rust-lang.org/" class="result__a">Blog</a>
        </div>
        <div class="result">
          <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdoc.rust-lang.org%2Fbook%2F">Dupe</a>
          <a class="result__a" href="//duckduckgo.com/l/?uddg=ftp%3A%2F%2Ffiles.test%2F">FTP</a>
          <a class="result__a" href="https://third.test/page?a=1&amp;b=2">Third</a>
        </div>
    "#;

    #[test]
    fn test_parse_results() {
        let urls = parse_results(PAGE, 10);
        assert_eq!(
            urls,
            vec![
                "https://doc.rust-lang.org/book/",
                "https://blog.rust-lang.org/",
                "https://third.test/page?a=1&b=2",
            ]
        );
    }

    #[test]
    fn test_limit() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
        assert!(parse_results("<html></html>", 5).is_empty());
    }
}
