//! Build command - ingest a directory into the index.

use super::{ensure_ollama, load, open_index, runtime};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use neogpt_config::{Config, VectorStoreKind};
use neogpt_core::{ErrorKind, IngestionReport, Source};
use neogpt_ingest::{
    CancelToken, ChunkConfig, HttpFetcher, IndexBuilder, IndexWriter, IngestError, LoaderRegistry,
    ProgressFn,
};
use neogpt_ollama::OllamaEmbedder;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct BuildArgs {
    pub path: Option<String>,
    pub vectorstore: Option<VectorStoreKind>,
    pub recursive: bool,
    pub concurrency: Option<usize>,
}

/// Command-line flags layered over the `[builder]` section.
fn apply_overrides(config: &mut Config, args: &BuildArgs) -> Result<()> {
    if let Some(kind) = args.vectorstore {
        config.builder.vectorstore = kind;
    }
    if args.recursive {
        config.builder.recursive = true;
    }
    if let Some(concurrency) = args.concurrency {
        config.builder.concurrency = concurrency;
    }
    config.validate().context("Invalid build settings")?;
    Ok(())
}

pub fn run(args: BuildArgs) -> Result<()> {
    let (paths, mut config) = load()?;
    apply_overrides(&mut config, &args)?;

    let dir = match &args.path {
        Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
        None => config.source_dir(),
    };
    if !dir.is_dir() {
        anyhow::bail!("Source directory does not exist: {}", dir.display());
    }

    if config.builder.vectorstore == VectorStoreKind::Memory {
        println!(
            "{} The memory vector store is discarded when the build finishes.",
            "Note:".yellow().bold()
        );
    }

    let rt = runtime()?;
    let client = ensure_ollama(&rt, &config, &[config.ollama.embedding_model.as_str()])?;
    let embedder = Arc::new(OllamaEmbedder::new(client, &config.ollama.embedding_model));
    let index = open_index(&paths, &config, config.builder.vectorstore)?;

    let fetcher = Arc::new(
        HttpFetcher::new(Duration::from_secs(config.ollama.timeout_seconds))
            .context("Failed to create HTTP client")?,
    );
    let registry = Arc::new(LoaderRegistry::standard(
        fetcher,
        ChunkConfig::from_builder_config(&config.builder),
    ));
    let builder = IndexBuilder::new(
        registry,
        config.builder.clone(),
        IndexWriter::new(embedder, index),
    );

    println!("{} {}", "Building index from".cyan().bold(), dir.display());
    println!(
        "  vectorstore: {:?}, recursive: {}, concurrency: {}",
        config.builder.vectorstore, config.builder.recursive, config.builder.concurrency
    );
    println!();

    let cancel = CancelToken::new();
    let outcome = rt.block_on(async {
        let sources = builder.discover(&dir)?;
        let work = builder.plan(sources).await;
        if work.is_empty() {
            return Ok(None);
        }

        let pb = ProgressBar::new(work.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("█▓░"),
        );
        let bar = pb.clone();
        let progress: ProgressFn = Arc::new(move |source: &Source, ok: bool| {
            if !ok {
                bar.set_message(format!("failed: {}", source.location()));
            }
            bar.inc(1);
        });

        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let result = builder.run(work, &cancel, Some(progress)).await;
        pb.finish_and_clear();
        anyhow::Ok(Some(result))
    })?;

    let Some(result) = outcome else {
        println!("{} Nothing to ingest in {}", "Note:".yellow(), dir.display());
        return Ok(());
    };

    match result {
        Ok(summary) => {
            print_report(&summary.report);
            println!("  {} chunks written to the index", summary.stored.to_string().green());
            Ok(())
        }
        Err(IngestError::BuildAborted { message, summary }) => {
            print_report(&summary.report);
            println!("  {} chunks written before the build stopped", summary.stored);
            anyhow::bail!("Build aborted: {}", message)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &IngestionReport) {
    println!("{}", "Build summary".cyan().bold());
    super::print_rule();
    println!("  Enqueued:   {}", report.enqueued());
    println!("  Succeeded:  {}", report.succeeded().to_string().green());
    println!("  Failed:     {}", report.failed().len().to_string().red());
    if report.cancelled() {
        println!("  Skipped:    {} (cancelled)", report.skipped().to_string().yellow());
    }
    println!("  Chunks:     {}", report.total_chunks());

    let unsupported = report.failures_of(ErrorKind::ClassificationUnsupported);
    if unsupported > 0 {
        println!("  {} unsupported file types", unsupported.to_string().dimmed());
    }

    let failures: Vec<_> = report
        .failed()
        .iter()
        .filter(|f| f.kind != ErrorKind::ClassificationUnsupported)
        .collect();
    if !failures.is_empty() {
        println!();
        println!("{}", "Failures:".red().bold());
        for failure in failures {
            println!(
                "  {} {} {}",
                "✗".red(),
                failure.source.location(),
                format!("[{}] {}", failure.kind, failure.message).dimmed()
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BuildArgs {
        BuildArgs {
            path: None,
            vectorstore: None,
            recursive: false,
            concurrency: None,
        }
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let args = BuildArgs {
            vectorstore: Some(VectorStoreKind::Memory),
            recursive: true,
            concurrency: Some(3),
            ..args()
        };
        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.builder.vectorstore, VectorStoreKind::Memory);
        assert!(config.builder.recursive);
        assert_eq!(config.builder.concurrency, 3);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        let args = BuildArgs {
            concurrency: Some(0),
            ..args()
        };
        assert!(apply_overrides(&mut config, &args).is_err());
    }
}
