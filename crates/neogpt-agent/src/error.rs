//! Error types for the agent loop.

use neogpt_core::ErrorKind;
use neogpt_retrieve::RetrieveError;
use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Validation failures, raised before any attempt runs.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Task description is empty")]
    EmptyTask,

    #[error("max_tries must be a positive integer, got {0}")]
    InvalidBudget(i64),
}

impl From<AgentError> for neogpt_core::Error {
    fn from(err: AgentError) -> Self {
        neogpt_core::Error::InvalidInput(err.to_string())
    }
}

/// How an executor failed. Only `Fatal` ends a session early.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("{0}")]
    Recoverable(String),

    #[error("{0}")]
    Fatal(String),
}

impl ExecutorError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutorError::Fatal(_))
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ExecutorError::Fatal(_) => Some(ErrorKind::ExecutorFatal),
            ExecutorError::Recoverable(_) => None,
        }
    }
}

impl From<neogpt_core::Error> for ExecutorError {
    fn from(err: neogpt_core::Error) -> Self {
        if err.is_unavailable() {
            ExecutorError::Fatal(err.to_string())
        } else {
            ExecutorError::Recoverable(err.to_string())
        }
    }
}

impl From<RetrieveError> for ExecutorError {
    fn from(err: RetrieveError) -> Self {
        match err {
            RetrieveError::Collaborator(inner) => inner.into(),
            RetrieveError::UnknownStrategy(_)
            | RetrieveError::InvalidOptions(_)
            | RetrieveError::MissingCollaborator { .. } => ExecutorError::Fatal(err.to_string()),
            RetrieveError::NoContext | RetrieveError::NotSelect(_) => {
                ExecutorError::Recoverable(err.to_string())
            }
        }
    }
}
