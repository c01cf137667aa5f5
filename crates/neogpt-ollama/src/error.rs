//! Ollama errors and their mapping onto collaborator errors.

use thiserror::Error;

pub type OllamaResult<T> = Result<T, OllamaError>;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Ollama server is not running at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    #[error("Model not found: {model}. Run 'ollama pull {model}' to download it.")]
    ModelNotFound { model: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Any other non-success status, with the body the server sent.
    #[error("Ollama returned status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A missing server or model makes the embedder and model unusable for the
/// rest of the run; everything else is a failed call.
impl From<OllamaError> for neogpt_core::Error {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::ServerNotRunning { .. } | OllamaError::ModelNotFound { .. } => {
                neogpt_core::Error::Unavailable(err.to_string())
            }
            OllamaError::Timeout { seconds } => neogpt_core::Error::Timeout { seconds },
            other => neogpt_core::Error::Model(other.to_string()),
        }
    }
}
