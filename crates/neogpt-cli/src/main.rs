//! NeoGPT CLI - build a local index and query it with selectable retrieval
//! strategies, or hand a task to the developer/reviewer agent.

mod commands;

use clap::{Parser, Subcommand};
use commands::ask::{ReplyOptions, DEFAULT_NOTES_FILE};
use colored::Colorize;
use neogpt_config::VectorStoreKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// NeoGPT - chat with your documents and the web, locally
#[derive(Parser)]
#[command(name = "neogpt")]
#[command(version)]
#[command(about = "Chat with your documents and the web using local models", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Log progress information
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to <data_dir>/logs/neogpt.log
    #[arg(long, global = true)]
    log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize NeoGPT (create config and index database)
    Init,

    /// Ingest a directory (and the URLs in its builder.url) into the index
    Build {
        /// Directory to ingest (default: general.source_dir)
        path: Option<String>,

        /// Vector store backend: sqlite or memory
        #[arg(long)]
        vectorstore: Option<VectorStoreKind>,

        /// Crawl links from listed URLs
        #[arg(short, long)]
        recursive: bool,

        /// Parallel ingestion workers
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Ask a single question
    Ask {
        /// Your question
        question: String,

        /// Retrieval strategy: local, web, hybrid, stepback, sql, compress
        #[arg(short, long)]
        strategy: Option<String>,

        /// Number of chunks to retrieve
        #[arg(short)]
        k: Option<usize>,

        /// Hide source references
        #[arg(long)]
        no_sources: bool,

        /// Stream the answer as it's generated
        #[arg(long)]
        stream: bool,

        /// Ask the model directly, without retrieving any context
        #[arg(long)]
        no_retrieval: bool,

        /// Append the answer and its sources to a markdown notes file
        #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_NOTES_FILE)]
        write: Option<PathBuf>,
    },

    /// Start an interactive chat
    Chat {
        /// Retrieval strategy: local, web, hybrid, stepback, sql, compress
        #[arg(short, long)]
        strategy: Option<String>,

        /// Number of chunks to retrieve
        #[arg(short)]
        k: Option<usize>,

        /// Start with retrieval off (toggle with /retrieval)
        #[arg(long)]
        no_retrieval: bool,

        /// Append every exchange to a markdown notes file
        #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_NOTES_FILE)]
        write: Option<PathBuf>,
    },

    /// Hand a task to the developer/reviewer agent
    Hire {
        /// Task description
        task: String,

        /// Attempts before giving up (default: agent.max_tries)
        #[arg(short, long, allow_negative_numbers = true)]
        tries: Option<i64>,

        /// Retrieval strategy used for context
        #[arg(short, long)]
        strategy: Option<String>,

        /// Do not retrieve context for the task
        #[arg(long)]
        no_context: bool,

        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., retrieval.strategy)
        key: String,

        /// Value to set
        value: String,
    },
}

fn default_filter(debug: bool, verbose: bool) -> &'static str {
    if debug {
        "neogpt=debug,info"
    } else if verbose {
        "neogpt=info,warn"
    } else {
        "warn"
    }
}

fn init_logging(debug: bool, verbose: bool, log_file: Option<PathBuf>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug, verbose)));

    let file_layer = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| eprintln!("{} cannot open log file {}: {}", "Warning:".yellow(), path.display(), e))
            .ok()?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let log_file = if cli.log { commands::log_file() } else { None };
    init_logging(cli.debug, cli.verbose, log_file);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Build {
            path,
            vectorstore,
            recursive,
            concurrency,
        } => commands::build::run(commands::build::BuildArgs {
            path,
            vectorstore,
            recursive,
            concurrency,
        }),
        Commands::Ask {
            question,
            strategy,
            k,
            no_sources,
            stream,
            no_retrieval,
            write,
        } => commands::ask::run(
            &question,
            strategy,
            k,
            ReplyOptions {
                show_sources: !no_sources,
                stream,
                no_retrieval,
                notes: write,
            },
        ),
        Commands::Chat {
            strategy,
            k,
            no_retrieval,
            write,
        } => commands::chat::run(
            strategy,
            k,
            ReplyOptions {
                no_retrieval,
                notes: write,
                ..Default::default()
            },
        ),
        Commands::Hire {
            task,
            tries,
            strategy,
            no_context,
            json,
        } => commands::hire::run(&task, tries, strategy, no_context, json),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
