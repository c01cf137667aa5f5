//! Aggregate outcome of an ingestion run.

use crate::error::ErrorKind;
use crate::types::Source;
use serde::Serialize;

/// A source that could not be ingested, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSource {
    pub source: Source,
    pub kind: ErrorKind,
    pub message: String,
}

/// Aggregate ingestion report. Counts only change through [`ReportBuilder`]
/// and [`IngestionReport::demote`].
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    enqueued: usize,
    succeeded: usize,
    failed: Vec<FailedSource>,
    skipped: usize,
    total_chunks: usize,
    cancelled: bool,
}

impl IngestionReport {
    /// Start building a report for `enqueued` work items.
    pub fn builder(enqueued: usize) -> ReportBuilder {
        ReportBuilder {
            report: IngestionReport {
                enqueued,
                succeeded: 0,
                failed: Vec::new(),
                skipped: 0,
                total_chunks: 0,
                cancelled: false,
            },
        }
    }

    pub fn enqueued(&self) -> usize {
        self.enqueued
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> &[FailedSource] {
        &self.failed
    }

    /// Items never started because ingestion was cancelled.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Number of items that reached a verdict.
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// Move a source that was counted as succeeded into the failures, for
    /// when its chunks could not be embedded or stored afterwards. The
    /// number of verdicts stays the same.
    pub fn demote(
        &mut self,
        source: Source,
        chunk_count: usize,
        kind: ErrorKind,
        message: impl Into<String>,
    ) {
        self.succeeded = self.succeeded.saturating_sub(1);
        self.total_chunks = self.total_chunks.saturating_sub(chunk_count);
        self.failed.push(FailedSource {
            source,
            kind,
            message: message.into(),
        });
    }

    /// Count failures of one kind.
    pub fn failures_of(&self, kind: ErrorKind) -> usize {
        self.failed.iter().filter(|f| f.kind == kind).count()
    }
}

/// Incremental builder; the only way to produce an [`IngestionReport`].
#[derive(Debug)]
pub struct ReportBuilder {
    report: IngestionReport,
}

impl ReportBuilder {
    pub fn record_success(&mut self, chunk_count: usize) {
        self.report.succeeded += 1;
        self.report.total_chunks += chunk_count;
    }

    pub fn record_failure(&mut self, source: Source, kind: ErrorKind, message: impl Into<String>) {
        self.report.failed.push(FailedSource {
            source,
            kind,
            message: message.into(),
        });
    }

    pub fn record_skipped(&mut self) {
        self.report.skipped += 1;
    }

    /// Verdicts recorded so far.
    pub fn attempted(&self) -> usize {
        self.report.attempted()
    }

    pub fn finish(mut self, cancelled: bool) -> IngestionReport {
        self.report.cancelled |= cancelled;
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_counts() {
        let mut builder = IngestionReport::builder(3);
        builder.record_success(4);
        builder.record_success(2);
        builder.record_failure(
            Source::new("b.unknownext"),
            ErrorKind::ClassificationUnsupported,
            "no loader",
        );
        let report = builder.finish(false);

        assert_eq!(report.enqueued(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.total_chunks(), 6);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.failures_of(ErrorKind::ClassificationUnsupported), 1);
        assert!(!report.cancelled());
    }

    #[test]
    fn test_demote_keeps_verdict_count() {
        let mut builder = IngestionReport::builder(2);
        builder.record_success(3);
        builder.record_success(2);
        let mut report = builder.finish(false);

        report.demote(Source::new("big.pdf"), 3, ErrorKind::ParseFailure, "embedding failed");

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.total_chunks(), 2);
        assert_eq!(report.attempted(), 2);
        assert_eq!(report.failures_of(ErrorKind::ParseFailure), 1);
        assert_eq!(report.failed()[0].message, "embedding failed");
    }
}
