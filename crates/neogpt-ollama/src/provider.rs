//! Collaborator trait implementations backed by Ollama.

use crate::client::OllamaClient;
use crate::types::{GenerateOptions, GenerateRequest};
use async_trait::async_trait;
use neogpt_config::OllamaConfig;
use neogpt_core::{Embedder, Generation, LanguageModel, Result};

/// Embeddings from a named Ollama embedding model.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &OllamaConfig) -> crate::OllamaResult<Self> {
        Ok(Self::new(
            OllamaClient::from_config(config)?,
            &config.embedding_model,
        ))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.client.embed(&self.model, text).await?)
    }
}

/// Text generation from a named Ollama chat model.
#[derive(Clone)]
pub struct OllamaModel {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaModel {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn from_config(config: &OllamaConfig) -> crate::OllamaResult<Self> {
        Ok(Self::new(OllamaClient::from_config(config)?, &config.model))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Request this model would send for `prompt`.
    pub fn request(&self, prompt: &str, system: Option<&str>) -> GenerateRequest {
        let mut request = GenerateRequest::new(&self.model, prompt)
            .with_options(GenerateOptions::new().with_temperature(self.temperature));
        if let Some(system) = system {
            request = request.with_system(system);
        }
        request
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation> {
        let response = self.client.generate(self.request(prompt, system)).await?;
        Ok(Generation {
            usage: response.usage(),
            text: response.response,
        })
    }
}
