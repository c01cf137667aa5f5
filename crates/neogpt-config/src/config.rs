//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Retrieval strategy names accepted as `retrieval.strategy`.
pub const KNOWN_STRATEGIES: [&str; 6] = ["local", "web", "hybrid", "stepback", "sql", "compress"];

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub builder: BuilderConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&paths.config_file)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        let default_config = Self::default_config_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default_config)?;
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# NeoGPT Configuration

[general]
# Data directory for the index database and logs
# data_dir = "~/.local/share/neogpt"

# Directory scanned by `neogpt build` when no path is given
source_dir = "documents"

[ollama]
# Ollama server address
host = "http://localhost:11434"

# Model used for answers, step-back questions, SQL and agent roles
model = "llama3"

# Model for generating embeddings
embedding_model = "nomic-embed-text"

# Request timeout in seconds
timeout_seconds = 120

[builder]
# Vector store backend: sqlite or memory
vectorstore = "sqlite"

# Follow links from URLs listed in builder.url
recursive = false
max_depth = 2
max_pages = 200

# Parallel ingestion workers
concurrency = 8

# Text chunking
chunk_size = 1000
chunk_overlap = 100

# File patterns to skip while scanning the source directory
ignore_patterns = [
    "*.tmp",
    "*.temp",
    ".DS_Store",
    "._*",
    "*.part",
]

[retrieval]
# One of: local, web, hybrid, stepback, sql, compress
strategy = "local"

# Number of chunks returned per query
k = 4

# Candidate pool for the stepback strategy (defaults to 4 * k)
# candidate_k = 16

# Result pages fetched by the web strategy
web_results = 4

# Weight of the local side when blending hybrid results
hybrid_weight = 0.5

# SQLite database queried by the sql strategy
# sql_database = "~/data/sales.db"

[agent]
# Attempts before a task is given up
max_tries = 5

# Seconds allowed per attempt
attempt_timeout_seconds = 300

# Retrieve context from the index before drafting a solution
use_context = true
"#
        .to_string()
    }

    /// Reject settings that cannot drive a build or a query.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.builder.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "builder.concurrency must be at least 1".to_string(),
            ));
        }
        if self.builder.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "builder.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.builder.chunk_overlap >= self.builder.chunk_size {
            return Err(ConfigError::Invalid(
                "builder.chunk_overlap must be smaller than builder.chunk_size".to_string(),
            ));
        }
        if self.retrieval.k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.k must be at least 1".to_string(),
            ));
        }
        if !KNOWN_STRATEGIES.contains(&self.retrieval.strategy.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "retrieval.strategy '{}' is not one of {}",
                self.retrieval.strategy,
                KNOWN_STRATEGIES.join(", ")
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.hybrid_weight) {
            return Err(ConfigError::Invalid(
                "retrieval.hybrid_weight must be between 0 and 1".to_string(),
            ));
        }
        if self.agent.max_tries == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_tries must be at least 1".to_string(),
            ));
        }
        if self.agent.attempt_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "agent.attempt_timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Data directory, honouring `general.data_dir` when set.
    pub fn data_dir(&self, paths: &AppPaths) -> PathBuf {
        match &self.general.data_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => paths.data_dir.clone(),
        }
    }

    /// Source directory with `~` expanded.
    pub fn source_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.general.source_dir).into_owned())
    }

    /// Stepback candidate pool size.
    pub fn candidate_k(&self) -> usize {
        self.retrieval
            .candidate_k
            .unwrap_or(self.retrieval.k * 4)
            .max(self.retrieval.k)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
    pub source_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            source_dir: "documents".to_string(),
        }
    }
}

/// Ollama LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Where embedded chunks are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreKind {
    Sqlite,
    Memory,
}

impl std::str::FromStr for VectorStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(VectorStoreKind::Sqlite),
            "memory" => Ok(VectorStoreKind::Memory),
            other => Err(ConfigError::Invalid(format!(
                "unknown vectorstore '{}', expected sqlite or memory",
                other
            ))),
        }
    }
}

/// Index building settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub vectorstore: VectorStoreKind,
    pub recursive: bool,
    pub max_depth: usize,
    pub max_pages: usize,
    pub concurrency: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub ignore_patterns: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            vectorstore: VectorStoreKind::Sqlite,
            recursive: false,
            max_depth: 2,
            max_pages: 200,
            concurrency: 8,
            chunk_size: 1000,
            chunk_overlap: 100,
            ignore_patterns: vec![
                "*.tmp".to_string(),
                "*.temp".to_string(),
                ".DS_Store".to_string(),
                "._*".to_string(),
                "*.part".to_string(),
            ],
        }
    }
}

/// Query-time settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub strategy: String,
    pub k: usize,
    pub candidate_k: Option<usize>,
    pub web_results: usize,
    pub hybrid_weight: f32,
    pub sql_database: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: "local".to_string(),
            k: 4,
            candidate_k: None,
            web_results: 4,
            hybrid_weight: 0.5,
            sql_database: None,
        }
    }
}

/// Agent task loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_tries: u32,
    pub attempt_timeout_seconds: u64,
    pub use_context: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tries: 5,
            attempt_timeout_seconds: 300,
            use_context: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.builder.concurrency, 8);
        assert_eq!(config.builder.max_depth, 2);
        assert_eq!(config.agent.max_tries, 5);
        assert_eq!(config.retrieval.strategy, "local");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_string_matches_defaults() {
        let parsed: Config = toml::from_str(&Config::default_config_string()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.builder.concurrency, defaults.builder.concurrency);
        assert_eq!(parsed.builder.chunk_size, defaults.builder.chunk_size);
        assert_eq!(parsed.retrieval.k, defaults.retrieval.k);
        assert_eq!(parsed.agent.attempt_timeout_seconds, 300);
        assert_eq!(parsed.builder.vectorstore, VectorStoreKind::Sqlite);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.ollama.host, deserialized.ollama.host);
        assert_eq!(config.retrieval.strategy, deserialized.retrieval.strategy);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [retrieval]
            strategy = "hybrid"
            "#
        )
        .unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();

        assert_eq!(config.retrieval.strategy, "hybrid");
        // Defaults should still work
        assert_eq!(config.retrieval.k, 4);
        assert_eq!(config.ollama.host, "http://localhost:11434");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.builder.concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.retrieval.strategy = "magic".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retrieval.k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.builder.chunk_overlap = config.builder.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempt_timeout() {
        let mut config = Config::default();
        config.agent.attempt_timeout_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("attempt_timeout_seconds"));
    }

    #[test]
    fn test_load_rejects_zero_concurrency() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[builder]\nconcurrency = 0").unwrap();

        assert!(Config::load_from(temp_file.path()).is_err());
    }

    #[test]
    fn test_candidate_k() {
        let mut config = Config::default();
        assert_eq!(config.candidate_k(), 16);

        config.retrieval.candidate_k = Some(2);
        assert_eq!(config.candidate_k(), 4);
    }

    #[test]
    fn test_vectorstore_from_str() {
        assert_eq!("SQLite".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Sqlite);
        assert_eq!("memory".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Memory);
        assert!("chroma".parse::<VectorStoreKind>().is_err());
    }
}
