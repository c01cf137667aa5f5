//! Wire shapes of the Ollama HTTP API.

use neogpt_core::Usage;
use serde::{Deserialize, Serialize};

/// One entry of `GET /api/tags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

/// Body of `POST /api/generate`. The client sets `stream` itself.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: false,
            options: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = Some(options);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A whole non-streamed reply, or one line of a streamed one. Token counts
/// only arrive on the final line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: u64,
    #[serde(default)]
    pub eval_count: u64,
}

impl GenerateResponse {
    pub fn usage(&self) -> Usage {
        Usage {
            prompt_tokens: self.prompt_eval_count,
            completion_tokens: self.eval_count,
            calls: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_serialization() {
        let request = GenerateRequest::new("llama3", "Hello")
            .with_system("Be brief.")
            .with_options(GenerateOptions::new().with_temperature(0.2));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "llama3");
        assert_eq!(value["system"], "Be brief.");
        assert_eq!(value["stream"], false);
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);

        let bare = serde_json::to_value(GenerateRequest::new("llama3", "Hi")).unwrap();
        assert!(bare.get("system").is_none());
        assert!(bare.get("options").is_none());
    }

    #[test]
    fn test_response_usage() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"model":"llama3","response":"hi","done":true,"prompt_eval_count":12,"eval_count":3}"#,
        )
        .unwrap();
        let usage = response.usage();

        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 3);
        assert_eq!(usage.calls, 1);
    }

    #[test]
    fn test_stream_line_without_counts() {
        let line: GenerateResponse = serde_json::from_str(r#"{"response":"par","done":false}"#).unwrap();
        assert_eq!(line.response, "par");
        assert_eq!(line.usage().prompt_tokens, 0);
    }
}
