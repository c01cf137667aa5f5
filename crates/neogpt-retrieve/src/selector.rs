//! Retrieval Strategy Selector.

use crate::error::{RetrieveError, RetrieveResult};
use crate::request::{RetrievalRequest, RetrievalResult, StrategyName};
use crate::strategies;
use neogpt_config::{BuilderConfig, RetrievalConfig};
use neogpt_core::{Embedder, Fetcher, LanguageModel, TableStore, VectorIndex, WebSearch};
use neogpt_ingest::ChunkConfig;
use std::sync::Arc;
use tracing::{debug, info};

/// Knobs that are not part of a single request.
#[derive(Debug, Clone)]
pub struct SelectorSettings {
    /// Result pages fetched by the `web` strategy.
    pub web_results: usize,
    /// Weight of the local side in `hybrid`; the web side gets the rest.
    pub hybrid_weight: f32,
    /// How fetched pages are split before scoring.
    pub chunking: ChunkConfig,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            web_results: 4,
            hybrid_weight: 0.5,
            chunking: ChunkConfig::default(),
        }
    }
}

impl SelectorSettings {
    pub fn from_config(retrieval: &RetrievalConfig, builder: &BuilderConfig) -> Self {
        Self {
            web_results: retrieval.web_results,
            hybrid_weight: retrieval.hybrid_weight.clamp(0.0, 1.0),
            chunking: ChunkConfig::from_builder_config(builder),
        }
    }
}

#[derive(Clone)]
pub(crate) struct WebAccess {
    pub(crate) search: Arc<dyn WebSearch>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
}

/// Dispatches a request to one of the six strategies. Collaborators that a
/// strategy needs but the selector lacks produce
/// [`RetrieveError::MissingCollaborator`].
#[derive(Clone)]
pub struct Selector {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) index: Arc<dyn VectorIndex>,
    pub(crate) model: Option<Arc<dyn LanguageModel>>,
    pub(crate) web: Option<WebAccess>,
    pub(crate) tables: Option<Arc<dyn TableStore>>,
    pub(crate) settings: SelectorSettings,
}

impl Selector {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            model: None,
            web: None,
            tables: None,
            settings: SelectorSettings::default(),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_web(mut self, search: Arc<dyn WebSearch>, fetcher: Arc<dyn Fetcher>) -> Self {
        self.web = Some(WebAccess { search, fetcher });
        self
    }

    pub fn with_tables(mut self, tables: Arc<dyn TableStore>) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn with_settings(mut self, settings: SelectorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SelectorSettings {
        &self.settings
    }

    pub(crate) fn model_for(&self, strategy: StrategyName) -> RetrieveResult<&Arc<dyn LanguageModel>> {
        self.model.as_ref().ok_or(RetrieveError::MissingCollaborator {
            strategy: strategy.as_str(),
            collaborator: "language model",
        })
    }

    pub(crate) fn web_for(&self, strategy: StrategyName) -> RetrieveResult<&WebAccess> {
        self.web.as_ref().ok_or(RetrieveError::MissingCollaborator {
            strategy: strategy.as_str(),
            collaborator: "web search",
        })
    }

    pub(crate) fn tables_for(&self, strategy: StrategyName) -> RetrieveResult<&Arc<dyn TableStore>> {
        self.tables.as_ref().ok_or(RetrieveError::MissingCollaborator {
            strategy: strategy.as_str(),
            collaborator: "table store",
        })
    }

    /// Run one request. The strategy name is validated before any
    /// collaborator is touched; an empty query yields an empty result.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> RetrieveResult<RetrievalResult> {
        let strategy: StrategyName = request.strategy_name.parse()?;

        if request.options.k == 0 {
            return Err(RetrieveError::InvalidOptions("k must be at least 1".to_string()));
        }

        let query = request.query.trim();
        if query.is_empty() {
            debug!("Empty query, nothing to retrieve");
            return Ok(RetrievalResult::empty());
        }

        info!("Retrieving with {} strategy (k = {})", strategy, request.options.k);
        let options = &request.options;

        let result = match strategy {
            StrategyName::Local => strategies::local::run(self, query, options).await?,
            StrategyName::Web => strategies::web::run(self, query, options).await?,
            StrategyName::Hybrid => strategies::hybrid::run(self, query, options).await?,
            StrategyName::Stepback => strategies::stepback::run(self, query, options).await?,
            StrategyName::Sql => strategies::sql::run(self, query, options).await?,
            StrategyName::Compress => strategies::compress::run(self, query, options).await?,
        };

        debug!(
            "{} strategy returned {} hits from {} sources",
            strategy,
            result.hits().len(),
            result.sources().len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use neogpt_core::ErrorKind;

    #[tokio::test]
    async fn test_unknown_strategy_touches_nothing() {
        let kit = Kit::new();
        let selector = kit.selector();

        let err = selector
            .retrieve(&RetrievalRequest::new("what is rust?", "unknown"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::UnknownStrategy));
        assert_eq!(kit.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_query_is_empty_result() {
        let kit = Kit::new();
        for strategy in StrategyName::ALL {
            let result = kit
                .selector()
                .retrieve(&RetrievalRequest::new("   ", strategy.as_str()))
                .await
                .unwrap();
            assert!(result.is_empty());
        }
        assert_eq!(kit.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_k_rejected() {
        let kit = Kit::new();
        let err = kit
            .selector()
            .retrieve(&RetrievalRequest::new("q", "local").with_k(0))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieveError::InvalidOptions(_)));
    }

    #[tokio::test]
    async fn test_missing_collaborators() {
        let kit = Kit::new();
        let bare = Selector::new(kit.embedder.clone(), kit.index.clone());

        for name in ["web", "hybrid", "stepback", "sql", "compress"] {
            let err = bare
                .retrieve(&RetrievalRequest::new("q", name))
                .await
                .unwrap_err();
            assert!(
                matches!(err, RetrieveError::MissingCollaborator { .. }),
                "{}: {}",
                name,
                err
            );
        }
    }
}
