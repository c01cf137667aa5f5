//! NeoGPT Ollama - Ollama integration for embeddings and text generation.
//!
//! [`OllamaClient`] speaks the HTTP API. [`OllamaEmbedder`] and
//! [`OllamaModel`] adapt it to the collaborator traits the ingestion,
//! retrieval and agent crates are written against.

mod client;
mod error;
mod provider;
mod types;

pub use client::OllamaClient;
pub use error::{OllamaError, OllamaResult};
pub use provider::{OllamaEmbedder, OllamaModel};
pub use types::*;
