//! Error types for retrieval.

use neogpt_core::ErrorKind;
use thiserror::Error;

/// Result type for retrieval operations.
pub type RetrieveResult<T> = Result<T, RetrieveError>;

#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("Unknown retrieval strategy '{0}' (expected one of local, web, hybrid, stepback, sql, compress)")]
    UnknownStrategy(String),

    #[error("Invalid retrieval options: {0}")]
    InvalidOptions(String),

    #[error("The {strategy} strategy needs a {collaborator}")]
    MissingCollaborator {
        strategy: &'static str,
        collaborator: &'static str,
    },

    #[error("No context was retrieved for the question")]
    NoContext,

    #[error("Generated query is not a single SELECT statement: {0}")]
    NotSelect(String),

    #[error(transparent)]
    Collaborator(#[from] neogpt_core::Error),
}

impl RetrieveError {
    /// Taxonomy entry, for errors that have one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RetrieveError::UnknownStrategy(_) => Some(ErrorKind::UnknownStrategy),
            RetrieveError::Collaborator(neogpt_core::Error::Fetch { .. }) => Some(ErrorKind::FetchError),
            _ => None,
        }
    }
}

impl From<RetrieveError> for neogpt_core::Error {
    fn from(err: RetrieveError) -> Self {
        match err {
            RetrieveError::Collaborator(inner) => inner,
            RetrieveError::UnknownStrategy(_) | RetrieveError::InvalidOptions(_) => {
                neogpt_core::Error::InvalidInput(err.to_string())
            }
            other => neogpt_core::Error::Other(other.to_string()),
        }
    }
}
