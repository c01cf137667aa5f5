//! Initialize NeoGPT.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use neogpt_config::Config;
use neogpt_db::Database;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!("{} NeoGPT is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing NeoGPT...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    if !paths.config_file.exists() {
        Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
    }
    println!("  {} Config: {}", "✓".green(), paths.config_file.display());

    let _db = Database::open(&paths.database_file).context("Failed to initialize database")?;
    println!("  {} Database: {}", "✓".green(), paths.database_file.display());

    println!();
    println!("{}", "NeoGPT initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Put documents in {} or pass a path", "documents/".cyan());
    println!("  2. Build the index: {}", "neogpt build".cyan());
    println!("  3. Ask a question: {}", "neogpt ask \"...\"".cyan());

    Ok(())
}
