//! Error types for the ingestion pipeline.

use crate::builder::BuildSummary;
use neogpt_core::{ErrorKind, LoaderId};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No loader matches {0}")]
    Unsupported(String),

    #[error("Parse error for {location}: {message}")]
    Parse { location: String, message: String },

    #[error("No adapter available for loader {0}")]
    NoAdapter(LoaderId),

    #[error("Invalid ingestion settings: {0}")]
    InvalidSettings(String),

    /// The index or embedder stopped serving mid-write. `summary` holds the
    /// report with every unwritten source listed as failed.
    #[error("Build aborted: {message}")]
    BuildAborted {
        message: String,
        summary: Box<BuildSummary>,
    },

    #[error(transparent)]
    Collaborator(#[from] neogpt_core::Error),
}

impl IngestError {
    pub fn parse(location: impl Into<String>, message: impl std::fmt::Display) -> Self {
        IngestError::Parse {
            location: location.into(),
            message: message.to_string(),
        }
    }

    /// Where this failure lands in the ingestion report.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Unsupported(_) => ErrorKind::ClassificationUnsupported,
            IngestError::Collaborator(neogpt_core::Error::Fetch { .. }) => ErrorKind::FetchError,
            _ => ErrorKind::ParseFailure,
        }
    }
}
