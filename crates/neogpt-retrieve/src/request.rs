//! Retrieval requests and results.

use crate::error::RetrieveError;
use neogpt_config::RetrievalConfig;
use neogpt_core::{ChunkId, IndexMatch, Usage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The closed set of retrieval strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyName {
    Local,
    Web,
    Hybrid,
    Stepback,
    Sql,
    Compress,
}

impl StrategyName {
    pub const ALL: [StrategyName; 6] = [
        StrategyName::Local,
        StrategyName::Web,
        StrategyName::Hybrid,
        StrategyName::Stepback,
        StrategyName::Sql,
        StrategyName::Compress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyName::Local => "local",
            StrategyName::Web => "web",
            StrategyName::Hybrid => "hybrid",
            StrategyName::Stepback => "stepback",
            StrategyName::Sql => "sql",
            StrategyName::Compress => "compress",
        }
    }
}

impl FromStr for StrategyName {
    type Err = RetrieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        StrategyName::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| RetrieveError::UnknownStrategy(name.to_string()))
    }
}

impl std::fmt::Display for StrategyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalOptions {
    /// Hits to return.
    pub k: usize,
    /// Candidate pool for `stepback`; `4 * k` when unset.
    pub candidate_k: Option<usize>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            k: 4,
            candidate_k: None,
        }
    }
}

impl RetrievalOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            k: config.k,
            candidate_k: config.candidate_k,
        }
    }

    pub fn candidate_k(&self) -> usize {
        self.candidate_k.unwrap_or(self.k * 4).max(self.k)
    }
}

/// A query plus the strategy that should answer it. The strategy stays a
/// string until the selector validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    pub strategy_name: String,
    pub options: RetrievalOptions,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, strategy_name: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            strategy_name: strategy_name.into(),
            options: RetrievalOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RetrievalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.options.k = k;
        self
    }
}

/// One retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub chunk_ref: ChunkId,
    pub content: String,
    pub score: f32,
    pub source_location: String,
}

impl From<IndexMatch> for Hit {
    fn from(m: IndexMatch) -> Self {
        Self {
            chunk_ref: m.chunk.id,
            content: m.chunk.content,
            score: m.score,
            source_location: m.chunk.source_location,
        }
    }
}

/// Hits ordered by score, best first, ties in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    hits: Vec<Hit>,
    sources: Vec<String>,
    usage: Usage,
}

impl RetrievalResult {
    /// Sort (stable, descending), keep the best `k` and attribute sources.
    pub fn ranked(mut hits: Vec<Hit>, k: usize, usage: Usage) -> Self {
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        let mut sources: Vec<String> = Vec::new();
        for hit in &hits {
            if !sources.contains(&hit.source_location) {
                sources.push(hit.source_location.clone());
            }
        }

        Self {
            hits,
            sources,
            usage,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn into_hits(self) -> Vec<Hit> {
        self.hits
    }

    /// Distinct source locations in rank order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
