//! Index building: discover sources, classify, crawl, ingest, embed.

use crate::classifier::{classify, ClassifierTables};
use crate::crawler::{CrawlItem, Crawler};
use crate::error::{IngestError, IngestResult};
use crate::registry::LoaderRegistry;
use crate::scheduler::{CancelToken, ProgressFn, Scheduler, WorkItem};
use crate::writer::IndexWriter;
use glob::Pattern;
use neogpt_config::BuilderConfig;
use neogpt_core::{ErrorKind, IngestionReport, LoaderId, Source};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File in the source directory listing one URL per line.
pub const URL_LIST_FILE: &str = "builder.url";

/// Outcome of one build.
#[derive(Debug)]
pub struct BuildSummary {
    pub report: IngestionReport,
    /// Chunks embedded and written to the index.
    pub stored: usize,
}

pub struct IndexBuilder {
    registry: Arc<LoaderRegistry>,
    settings: BuilderConfig,
    ignore: Vec<Pattern>,
    writer: IndexWriter,
}

impl IndexBuilder {
    pub fn new(registry: Arc<LoaderRegistry>, settings: BuilderConfig, writer: IndexWriter) -> Self {
        let ignore = settings
            .ignore_patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring invalid ignore pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            registry,
            settings,
            ignore,
            writer,
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        if name.starts_with('.') {
            return true;
        }
        self.ignore.iter().any(|p| p.matches(name))
    }

    /// Files under `dir` plus the URLs listed in its `builder.url`, in a
    /// stable order.
    pub fn discover(&self, dir: &Path) -> IngestResult<Vec<Source>> {
        if !dir.exists() {
            return Err(IngestError::FileNotFound(dir.to_path_buf()));
        }

        let mut sources = Vec::new();
        let mut url_lists: Vec<PathBuf> = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || self.is_ignored(path) {
                continue;
            }

            let location = path.to_string_lossy().into_owned();
            if ClassifierTables::standard().is_reserved(&location) {
                url_lists.push(path.to_path_buf());
                continue;
            }
            sources.push(Source::new(location));
        }

        for list in url_lists {
            let raw = std::fs::read_to_string(&list)?;
            let urls = read_url_list(&raw);
            debug!("{} lists {} URLs", list.display(), urls.len());
            sources.extend(urls.into_iter().map(Source::new));
        }

        Ok(sources)
    }

    /// Classify every source, expanding crawl seeds into the pages they
    /// reach. Each location appears at most once.
    pub async fn plan(&self, sources: Vec<Source>) -> Vec<WorkItem> {
        let mut work = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for source in sources {
            let binding = match classify(&source, self.settings.recursive) {
                Ok(binding) => binding,
                Err(e) => {
                    debug!("Not ingesting {}: {}", source, e);
                    if seen.insert(source.location().to_string()) {
                        work.push(WorkItem::rejected(source, &e));
                    }
                    continue;
                }
            };

            if binding.loader != LoaderId::RecursiveUrl {
                if seen.insert(binding.source.location().to_string()) {
                    work.push(WorkItem::Bound(binding));
                }
                continue;
            }

            let mut crawler = Crawler::new(
                source.location(),
                true,
                self.settings.max_depth,
                self.settings.max_pages,
                self.registry.fetcher(),
            );
            while let Some(item) = crawler.next().await {
                match item {
                    CrawlItem::Url(url) => {
                        if !seen.insert(url.clone()) {
                            continue;
                        }
                        let page = Source::new(url);
                        match classify(&page, false) {
                            Ok(binding) => work.push(WorkItem::Bound(binding)),
                            Err(e) => work.push(WorkItem::rejected(page, &e)),
                        }
                    }
                    CrawlItem::Failed { url, message } => {
                        if seen.insert(url.clone()) {
                            work.push(WorkItem::Rejected {
                                source: Source::new(url),
                                kind: ErrorKind::FetchError,
                                message,
                            });
                        }
                    }
                }
            }
            info!(
                "Crawled {} ({} URLs seen)",
                source.location(),
                crawler.visited_count()
            );
        }

        work
    }

    /// Full build of `dir` into the index.
    pub async fn build(
        &self,
        dir: &Path,
        cancel: &CancelToken,
        progress: Option<ProgressFn>,
    ) -> IngestResult<BuildSummary> {
        let sources = self.discover(dir)?;
        info!("Discovered {} sources in {}", sources.len(), dir.display());

        let work = self.plan(sources).await;
        self.run(work, cancel, progress).await
    }

    /// Ingest an explicit work list and write what it produced. Sources whose
    /// chunks fail to embed or store are moved into the report's failures.
    pub async fn run(
        &self,
        work: Vec<WorkItem>,
        cancel: &CancelToken,
        progress: Option<ProgressFn>,
    ) -> IngestResult<BuildSummary> {
        let mut scheduler = Scheduler::new(self.registry.clone(), self.settings.concurrency)?;
        if let Some(progress) = progress {
            scheduler = scheduler.with_progress(progress);
        }

        let outcome = scheduler.ingest(work, cancel).await;
        let mut report = outcome.report;
        if outcome.chunks.is_empty() {
            return Ok(BuildSummary { report, stored: 0 });
        }

        let written = self.writer.write(&outcome.chunks).await;
        for failed in written.failed {
            report.demote(
                Source::new(failed.location),
                failed.chunk_count,
                ErrorKind::ParseFailure,
                failed.message,
            );
        }

        let summary = BuildSummary {
            report,
            stored: written.stored,
        };
        match written.aborted {
            Some(message) => Err(IngestError::BuildAborted {
                message,
                summary: Box::new(summary),
            }),
            None => Ok(summary),
        }
    }
}

/// Non-empty, non-comment lines of a URL list.
pub fn read_url_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
