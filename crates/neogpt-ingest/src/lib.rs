//! NeoGPT Ingest - source classification and the concurrent ingestion pipeline.
//!
//! This crate provides:
//! - Extension classification of files and URLs to loaders
//! - Built-in loaders behind a static registry
//! - Content chunking for retrieval
//! - A bounded recursive crawler
//! - A fixed-width worker pool producing an ingestion report
//! - Index building (discovery, embedding, storage)

mod builder;
mod chunker;
mod classifier;
mod crawler;
mod error;
mod fetch;
pub mod loaders;
mod registry;
mod scheduler;
mod writer;

pub use builder::{read_url_list, BuildSummary, IndexBuilder, URL_LIST_FILE};
pub use chunker::{ChunkConfig, Chunker};
pub use classifier::{classify, ClassifierTables, RESERVED_FILE_NAMES};
pub use crawler::{normalize_url, CrawlItem, Crawler};
pub use error::{IngestError, IngestResult};
pub use fetch::HttpFetcher;
pub use registry::{LoaderCapability, LoaderRegistry};
pub use scheduler::{CancelToken, IngestOutcome, ProgressFn, Scheduler, WorkItem, DEFAULT_CONCURRENCY};
pub use writer::{FailedWrite, IndexWriter, WriteOutcome};
