//! Error types for NeoGPT.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type, returned by collaborator implementations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The collaborator cannot serve requests at all (server down, model missing).
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the same call cannot succeed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable(_))
    }
}

/// Result type alias using NeoGPT's core Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// The failure taxonomy surfaced in reports and to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No loader matched the source.
    ClassificationUnsupported,
    /// A loader failed on a specific source.
    ParseFailure,
    /// A URL could not be retrieved.
    FetchError,
    /// The retrieval strategy name is not one of the known strategies.
    UnknownStrategy,
    /// The task executor hit a non-recoverable condition.
    ExecutorFatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ClassificationUnsupported => "classification_unsupported",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::FetchError => "fetch_error",
            ErrorKind::UnknownStrategy => "unknown_strategy",
            ErrorKind::ExecutorFatal => "executor_fatal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
