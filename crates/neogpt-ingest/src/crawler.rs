//! Recursive Crawler.
//!
//! A pull-based breadth-first walk from a seed URL. Each call to
//! [`Crawler::next`] performs at most one fetch, so the caller controls the
//! pace. Traversal stays on the seed's host and is bounded by depth, a page
//! ceiling and a visited set of normalized URLs, which makes cyclic link
//! graphs terminate.

use neogpt_core::Fetcher;
use regex::Regex;
use reqwest::Url;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

const HREF_PATTERN: &str = r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)')"#;

static HREF: OnceLock<Regex> = OnceLock::new();

fn href_regex() -> &'static Regex {
    HREF.get_or_init(|| Regex::new(HREF_PATTERN).expect("href regex must compile"))
}

/// One step of a crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlItem {
    Url(String),
    /// The page could not be fetched; traversal continues without its links.
    Failed { url: String, message: String },
}

/// Canonical form used for the visited set: lowercased scheme and host, no
/// fragment, no default port, no trailing `/` except on the root path.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    Some(url.to_string())
}

/// Absolute links found in `html`, resolved against `base`.
fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    href_regex()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .collect()
}

pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    recursive: bool,
    max_depth: usize,
    max_pages: usize,
    host: Option<String>,
    frontier: VecDeque<(String, usize)>,
    visited: HashSet<String>,
    emitted: usize,
}

impl Crawler {
    /// `max_depth` counts link hops from the seed, which is depth 0.
    pub fn new(
        seed: impl Into<String>,
        recursive: bool,
        max_depth: usize,
        max_pages: usize,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let seed = seed.into();
        let host = Url::parse(&seed)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

        let mut visited = HashSet::new();
        visited.insert(normalize_url(&seed).unwrap_or_else(|| seed.clone()));

        let mut frontier = VecDeque::new();
        frontier.push_back((seed, 0));

        Self {
            fetcher,
            recursive,
            max_depth,
            max_pages: max_pages.max(1),
            host,
            frontier,
            visited,
            emitted: 0,
        }
    }

    /// Number of distinct URLs seen so far, including queued ones.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Next URL of the walk, or `None` when it is exhausted.
    pub async fn next(&mut self) -> Option<CrawlItem> {
        if self.emitted >= self.max_pages {
            if !self.frontier.is_empty() {
                debug!("Crawl stopped at {} pages", self.max_pages);
                self.frontier.clear();
            }
            return None;
        }

        let (url, depth) = self.frontier.pop_front()?;
        self.emitted += 1;

        if !self.recursive {
            return Some(CrawlItem::Url(url));
        }

        let body = match self.fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Crawl fetch failed for {}: {}", url, e);
                return Some(CrawlItem::Failed {
                    url,
                    message: e.to_string(),
                });
            }
        };

        if depth < self.max_depth {
            self.enqueue_links(&url, &body, depth + 1);
        }

        Some(CrawlItem::Url(url))
    }

    fn enqueue_links(&mut self, page: &str, body: &str, depth: usize) {
        let Ok(base) = Url::parse(page) else {
            return;
        };

        for link in extract_links(&base, body) {
            let same_host = link
                .host_str()
                .map(|h| Some(h.to_ascii_lowercase()) == self.host)
                .unwrap_or(false);
            if !same_host {
                continue;
            }
            let Some(normalized) = normalize_url(link.as_str()) else {
                continue;
            };
            if self.visited.insert(normalized.clone()) {
                self.frontier.push_back((normalized, depth));
            }
        }
    }

    /// Drain the whole walk.
    pub async fn collect(mut self) -> Vec<CrawlItem> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }
}
