//! Configuration commands.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use neogpt_config::Config;

pub fn show() -> Result<()> {
    let paths = get_paths()?;

    if !paths.config_file.exists() {
        anyhow::bail!("Config file not found. Run 'neogpt init' first.");
    }

    let contents = std::fs::read_to_string(&paths.config_file).context("Failed to read config file")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", paths.config_file.display().to_string().dimmed());
    println!();
    println!("{}", contents);

    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

/// Apply `key = value` to `config`. Empty values clear optional keys.
pub fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let optional = |v: &str| (!v.trim().is_empty()).then(|| v.trim().to_string());
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "data_dir"] => config.general.data_dir = optional(value),
        ["general", "source_dir"] => config.general.source_dir = value.to_string(),
        ["ollama", "host"] => config.ollama.host = value.to_string(),
        ["ollama", "model"] => config.ollama.model = value.to_string(),
        ["ollama", "embedding_model"] => config.ollama.embedding_model = value.to_string(),
        ["ollama", "timeout_seconds"] => config.ollama.timeout_seconds = parse(key, value)?,
        ["builder", "vectorstore"] => config.builder.vectorstore = parse(key, value)?,
        ["builder", "recursive"] => config.builder.recursive = parse(key, value)?,
        ["builder", "max_depth"] => config.builder.max_depth = parse(key, value)?,
        ["builder", "max_pages"] => config.builder.max_pages = parse(key, value)?,
        ["builder", "concurrency"] => config.builder.concurrency = parse(key, value)?,
        ["builder", "chunk_size"] => config.builder.chunk_size = parse(key, value)?,
        ["builder", "chunk_overlap"] => config.builder.chunk_overlap = parse(key, value)?,
        ["retrieval", "strategy"] => config.retrieval.strategy = value.trim().to_lowercase(),
        ["retrieval", "k"] => config.retrieval.k = parse(key, value)?,
        ["retrieval", "candidate_k"] => {
            config.retrieval.candidate_k = match optional(value) {
                Some(v) => Some(parse(key, &v)?),
                None => None,
            }
        }
        ["retrieval", "web_results"] => config.retrieval.web_results = parse(key, value)?,
        ["retrieval", "hybrid_weight"] => config.retrieval.hybrid_weight = parse(key, value)?,
        ["retrieval", "sql_database"] => config.retrieval.sql_database = optional(value),
        ["agent", "max_tries"] => config.agent.max_tries = parse(key, value)?,
        ["agent", "attempt_timeout_seconds"] => {
            config.agent.attempt_timeout_seconds = parse(key, value)?
        }
        ["agent", "use_context"] => config.agent.use_context = parse(key, value)?,
        _ => anyhow::bail!("Unknown config key: {}", key),
    }

    config.validate().context("Rejected configuration")?;
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = get_paths()?;

    let mut config = Config::load_from(&paths.config_file).context("Failed to load config")?;
    apply(&mut config, key, value)?;
    config.save_to(&paths.config_file).context("Failed to save config")?;

    println!("{} Set {} = {}", "✓".green(), key.cyan(), value);

    Ok(())
}
