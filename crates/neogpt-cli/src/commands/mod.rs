//! CLI command implementations.

pub mod ask;
pub mod build;
pub mod chat;
pub mod config;
pub mod hire;
pub mod init;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use neogpt_config::{AppPaths, Config, VectorStoreKind};
use neogpt_core::{Embedder, Fetcher, LanguageModel, VectorIndex};
use neogpt_db::{Database, InMemoryIndex, SqliteIndex, SqliteTables};
use neogpt_ingest::HttpFetcher;
use neogpt_ollama::{OllamaClient, OllamaEmbedder, OllamaModel};
use neogpt_retrieve::{DuckDuckGoSearch, RetrievalOptions, Selector, SelectorSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Configuration plus paths with `general.data_dir` applied.
pub fn load() -> Result<(AppPaths, Config)> {
    let paths = get_paths()?;
    let config = Config::load_from(&paths.config_file).context("Failed to load configuration")?;
    let paths = paths.relocate_data(&config.data_dir(&paths));
    debug!("Data directory: {}", paths.data_dir.display());
    Ok((paths, config))
}

/// Log file location, if the directories can be resolved.
pub fn log_file() -> Option<PathBuf> {
    load().ok().map(|(paths, _)| paths.log_file())
}

pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}

/// Fail early with a useful message when Ollama is not reachable or a
/// model the command needs has not been pulled.
pub fn ensure_ollama(rt: &Runtime, config: &Config, models: &[&str]) -> Result<OllamaClient> {
    let client = OllamaClient::from_config(&config.ollama).context("Failed to create Ollama client")?;
    if !rt.block_on(client.is_available()) {
        anyhow::bail!(
            "Ollama is not running at {}. Start it with 'ollama serve'.",
            config.ollama.host
        );
    }

    let missing = rt
        .block_on(client.missing_models(models))
        .context("Failed to list Ollama models")?;
    if let Some(message) = missing_models_message(&missing) {
        anyhow::bail!(message);
    }
    Ok(client)
}

fn missing_models_message(missing: &[String]) -> Option<String> {
    if missing.is_empty() {
        return None;
    }
    let pulls: Vec<String> = missing.iter().map(|m| format!("'ollama pull {}'", m)).collect();
    Some(format!(
        "Model{} not installed: {}. Run {}.",
        if missing.len() == 1 { "" } else { "s" },
        missing.join(", "),
        pulls.join(" and ")
    ))
}

/// Everything the retrieval and agent commands share.
pub struct Services {
    pub client: OllamaClient,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub model: Arc<OllamaModel>,
    pub fetcher: Arc<dyn Fetcher>,
}

impl Services {
    pub fn connect(rt: &Runtime, paths: &AppPaths, config: &Config) -> Result<Self> {
        let client = ensure_ollama(
            rt,
            config,
            &[config.ollama.model.as_str(), config.ollama.embedding_model.as_str()],
        )?;
        let embedder: Arc<dyn Embedder> =
            Arc::new(OllamaEmbedder::new(client.clone(), &config.ollama.embedding_model));
        let model = Arc::new(OllamaModel::new(client.clone(), &config.ollama.model));
        let index = open_index(paths, config, config.builder.vectorstore)?;
        let fetcher: Arc<dyn Fetcher> = Arc::new(
            HttpFetcher::new(Duration::from_secs(config.ollama.timeout_seconds))
                .context("Failed to create HTTP client")?,
        );

        Ok(Self {
            client,
            embedder,
            index,
            model,
            fetcher,
        })
    }

    /// A selector with every collaborator the configuration allows.
    pub fn selector(&self, config: &Config) -> Selector {
        let search = Arc::new(DuckDuckGoSearch::new(self.fetcher.clone()));
        let model: Arc<dyn LanguageModel> = self.model.clone();
        let mut selector = Selector::new(self.embedder.clone(), self.index.clone())
            .with_model(model)
            .with_web(search, self.fetcher.clone())
            .with_settings(SelectorSettings::from_config(&config.retrieval, &config.builder));

        if let Some(path) = &config.retrieval.sql_database {
            let path = shellexpand::tilde(path).into_owned();
            selector = selector.with_tables(Arc::new(SqliteTables::new(path)));
        }
        selector
    }
}

/// Open the configured vector store.
pub fn open_index(
    paths: &AppPaths,
    config: &Config,
    kind: VectorStoreKind,
) -> Result<Arc<dyn VectorIndex>> {
    match kind {
        VectorStoreKind::Sqlite => {
            let db = Database::open(&paths.database_file).context("Failed to open index database")?;
            Ok(Arc::new(SqliteIndex::new(db, &config.ollama.embedding_model)))
        }
        VectorStoreKind::Memory => Ok(Arc::new(InMemoryIndex::new())),
    }
}

/// Request options from config with an optional `k` override.
pub fn retrieval_options(config: &Config, k: Option<usize>) -> RetrievalOptions {
    let mut options = RetrievalOptions::from_config(&config.retrieval);
    if let Some(k) = k {
        options.k = k;
    }
    options
}

pub fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

pub fn print_rule() {
    println!("{}", "─".repeat(70));
}
