//! Concurrent Ingestion Scheduler.
//!
//! A fixed pool of tokio workers drains one shared queue of loader bindings.
//! Results land in a mutex-protected accumulator; a failing or panicking
//! loader only marks its own source as failed.

use crate::error::{IngestError, IngestResult};
use crate::registry::LoaderRegistry;
use futures_util::FutureExt;
use neogpt_core::{Chunk, ErrorKind, IngestionReport, LoaderBinding, ReportBuilder, Source};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Shared cancellation flag. Workers check it before every dequeue.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One entry of the work list.
#[derive(Debug, Clone)]
pub enum WorkItem {
    Bound(LoaderBinding),
    /// Failed before scheduling (classification, crawl fetch); recorded
    /// without occupying a worker.
    Rejected {
        source: Source,
        kind: ErrorKind,
        message: String,
    },
}

impl WorkItem {
    pub fn rejected(source: Source, err: &IngestError) -> Self {
        WorkItem::Rejected {
            source,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn source(&self) -> &Source {
        match self {
            WorkItem::Bound(binding) => &binding.source,
            WorkItem::Rejected { source, .. } => source,
        }
    }
}

/// Report plus every chunk produced, grouped by source in sequence order.
#[derive(Debug)]
pub struct IngestOutcome {
    pub report: IngestionReport,
    pub chunks: Vec<Chunk>,
}

/// Called once per finished item with whether it succeeded.
pub type ProgressFn = Arc<dyn Fn(&Source, bool) + Send + Sync>;

struct Accumulator {
    report: ReportBuilder,
    chunks: Vec<Chunk>,
}

pub struct Scheduler {
    registry: Arc<LoaderRegistry>,
    concurrency: usize,
    progress: Option<ProgressFn>,
}

impl Scheduler {
    pub fn new(registry: Arc<LoaderRegistry>, concurrency: usize) -> IngestResult<Self> {
        if concurrency == 0 {
            return Err(IngestError::InvalidSettings(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            registry,
            concurrency,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run the work list to completion (or cancellation) and report.
    pub async fn ingest(&self, work: Vec<WorkItem>, cancel: &CancelToken) -> IngestOutcome {
        let enqueued = work.len();
        let mut report = IngestionReport::builder(enqueued);
        let mut queue = VecDeque::with_capacity(enqueued);

        for item in work {
            match item {
                WorkItem::Bound(binding) => queue.push_back(binding),
                WorkItem::Rejected { source, kind, message } => {
                    debug!("Rejected {}: {}", source, message);
                    if let Some(progress) = &self.progress {
                        progress(&source, false);
                    }
                    report.record_failure(source, kind, message);
                }
            }
        }

        let workers = self.concurrency.min(queue.len()).max(1);
        info!(
            "Ingesting {} sources with {} workers ({} rejected up front)",
            queue.len(),
            workers,
            report.attempted()
        );

        let queue = Arc::new(Mutex::new(queue));
        let accumulator = Arc::new(Mutex::new(Accumulator {
            report,
            chunks: Vec::new(),
        }));

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let accumulator = Arc::clone(&accumulator);
            let registry = Arc::clone(&self.registry);
            let cancel = cancel.clone();
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        debug!("Worker {} stopping on cancellation", worker);
                        break;
                    }
                    let Some(binding) = queue.lock().await.pop_front() else {
                        break;
                    };

                    let outcome = AssertUnwindSafe(registry.parse(&binding))
                        .catch_unwind()
                        .await;

                    let succeeded = outcome.as_ref().map(|r| r.is_ok()).unwrap_or(false);
                    if let Some(progress) = &progress {
                        progress(&binding.source, succeeded);
                    }

                    let mut acc = accumulator.lock().await;
                    match outcome {
                        Ok(Ok(chunks)) => {
                            debug!("{} -> {} chunks", binding.source, chunks.len());
                            acc.report.record_success(chunks.len());
                            acc.chunks.extend(chunks);
                        }
                        Ok(Err(e)) => {
                            warn!("Failed to ingest {}: {}", binding.source, e);
                            acc.report.record_failure(binding.source, e.kind(), e.to_string());
                        }
                        Err(_) => {
                            error!("Loader panicked on {}", binding.source);
                            acc.report.record_failure(
                                binding.source,
                                ErrorKind::ParseFailure,
                                "loader panicked",
                            );
                        }
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Ingestion worker failed: {}", e);
            }
        }

        let remaining: Vec<LoaderBinding> = queue.lock().await.drain(..).collect();
        let Accumulator { mut report, chunks } = match Arc::try_unwrap(accumulator) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => {
                let mut guard = shared.lock().await;
                std::mem::replace(
                    &mut *guard,
                    Accumulator {
                        report: IngestionReport::builder(0),
                        chunks: Vec::new(),
                    },
                )
            }
        };

        for binding in &remaining {
            debug!("Skipped {} after cancellation", binding.source);
            report.record_skipped();
        }

        let report = report.finish(cancel.is_cancelled());
        info!(
            "Ingestion finished: {} succeeded, {} failed, {} skipped, {} chunks",
            report.succeeded(),
            report.failed().len(),
            report.skipped(),
            report.total_chunks()
        );

        IngestOutcome { report, chunks }
    }
}
