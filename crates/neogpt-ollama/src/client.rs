//! Ollama HTTP client.

use crate::error::{OllamaError, OllamaResult};
use crate::types::*;
use futures_util::StreamExt;
use neogpt_config::OllamaConfig;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Fragments buffered between the streaming task and its reader.
const STREAM_BUFFER: usize = 100;

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Self::with_timeout(&config.host, Duration::from_secs(config.timeout_seconds))
    }

    pub fn new(host: impl Into<String>) -> OllamaResult<Self> {
        Self::with_timeout(&host.into(), DEFAULT_TIMEOUT)
    }

    fn with_timeout(host: &str, timeout: Duration) -> OllamaResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.host, endpoint)
    }

    /// Map transport failures onto the errors callers act on.
    fn transport_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning {
                host: self.host.clone(),
            }
        } else if e.is_timeout() {
            OllamaError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            OllamaError::Http(e)
        }
    }

    /// POST `body` to an endpoint that works on `model`, rejecting error statuses.
    async fn post<B: Serialize>(&self, endpoint: &str, model: &str, body: &B) -> OllamaResult<Response> {
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        ensure_success(response, model).await
    }

    pub async fn is_available(&self) -> bool {
        match self.client.get(self.url("tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama not reachable at {}: {}", self.host, e);
                false
            }
        }
    }

    /// Models pulled on the server.
    pub async fn list_models(&self) -> OllamaResult<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.url("tags"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let tags: TagsResponse = ensure_success(response, "").await?.json().await?;
        Ok(tags.models)
    }

    /// Which of `wanted` are not pulled on the server, in the given order.
    pub async fn missing_models(&self, wanted: &[&str]) -> OllamaResult<Vec<String>> {
        let installed = self.list_models().await?;
        Ok(wanted
            .iter()
            .filter(|model| !model_installed(&installed, model))
            .map(|model| model.to_string())
            .collect())
    }

    pub async fn embed(&self, model: &str, text: &str) -> OllamaResult<Vec<f32>> {
        debug!("Embedding {} chars with {}", text.len(), model);
        let request = EmbeddingRequest { model, prompt: text };
        let reply: EmbeddingResponse = self.post("embeddings", model, &request).await?.json().await?;
        Ok(reply.embedding)
    }

    /// One complete reply.
    pub async fn generate(&self, mut request: GenerateRequest) -> OllamaResult<GenerateResponse> {
        debug!("Generating with {}", request.model);
        request.stream = false;
        let response = self.post("generate", &request.model, &request).await?;
        Ok(response.json().await?)
    }

    /// Reply fragments in arrival order. The channel closes when the server
    /// marks the reply done or the connection ends.
    pub async fn generate_stream(
        &self,
        mut request: GenerateRequest,
    ) -> OllamaResult<mpsc::Receiver<String>> {
        debug!("Streaming from {}", request.model);
        request.stream = true;
        let response = self.post("generate", &request.model, &request).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(bytes) = body.next().await {
                let bytes = match bytes {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Generation stream broke off: {}", e);
                        return;
                    }
                };
                for line in lines.push(&bytes) {
                    if !forward_line(&tx, &line).await {
                        return;
                    }
                }
            }
            if let Some(line) = lines.finish() {
                forward_line(&tx, &line).await;
            }
        });

        Ok(rx)
    }
}

/// Turn a non-success status into `ModelNotFound` or `ApiError`.
async fn ensure_success(response: Response, model: &str) -> OllamaResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status.as_u16() == 404 || message.contains("not found") {
        return Err(OllamaError::ModelNotFound {
            model: model.to_string(),
        });
    }
    Err(OllamaError::ApiError {
        status: status.as_u16(),
        message,
    })
}

/// Send one stream line's text on. False once the stream should stop.
async fn forward_line(tx: &mpsc::Sender<String>, line: &str) -> bool {
    let fragment: GenerateResponse = match serde_json::from_str(line) {
        Ok(fragment) => fragment,
        Err(e) => {
            warn!("Skipping unreadable stream line: {}", e);
            return true;
        }
    };
    if !fragment.response.is_empty() && tx.send(fragment.response).await.is_err() {
        return false;
    }
    !fragment.done
}

/// Reassembles newline-delimited records from network chunks, which may end
/// mid-record or mid-character.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Whatever followed the last newline.
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

/// A bare name matches any tag of that model; `llama3` is satisfied by `llama3:8b`.
fn model_installed(installed: &[ModelInfo], model: &str) -> bool {
    installed.iter().any(|m| {
        m.name == model
            || (!model.contains(':')
                && m.name.strip_prefix(model).is_some_and(|tag| tag.starts_with(':')))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = OllamaConfig::default();
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.host(), "http://localhost:11434");
    }

    #[test]
    fn test_host_trailing_slash() {
        let client = OllamaClient::new("http://127.0.0.1:11434/").unwrap();
        assert_eq!(client.host(), "http://127.0.0.1:11434");
        assert_eq!(client.url("tags"), "http://127.0.0.1:11434/api/tags");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_not_running() {
        // Port 9 (discard) is almost never listening.
        let client = OllamaClient::new("http://127.0.0.1:9").unwrap();
        assert!(!client.is_available().await);

        let err = client.embed("nomic-embed-text", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            OllamaError::ServerNotRunning { .. } | OllamaError::Http(_)
        ));
    }

    #[test]
    fn test_line_buffer_joins_split_records() {
        let mut lines = LineBuffer::default();
        assert!(lines.push(br#"{"response":"he"#).is_empty());
        assert_eq!(
            lines.push(b"llo\"}\n{\"response\":\"!\"}\n\n{\"resp"),
            vec![r#"{"response":"hello"}"#, r#"{"response":"!"}"#]
        );
        assert_eq!(lines.finish().as_deref(), Some(r#"{"resp"#));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_line_buffer_keeps_split_characters() {
        let text = "{\"response\":\"café\"}\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut lines = LineBuffer::default();
        assert!(lines.push(&text[..split]).is_empty());
        assert_eq!(lines.push(&text[split..]), vec!["{\"response\":\"café\"}"]);
    }

    #[tokio::test]
    async fn test_forward_line_stops_on_done() {
        let (tx, mut rx) = mpsc::channel(4);
        assert!(forward_line(&tx, r#"{"response":"a","done":false}"#).await);
        assert!(forward_line(&tx, "not json").await);
        assert!(!forward_line(&tx, r#"{"response":"","done":true,"eval_count":2}"#).await);
        drop(tx);

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_model_installed_matches_tags() {
        let installed: Vec<ModelInfo> = ["llama3:8b", "nomic-embed-text:latest"]
            .iter()
            .map(|name| ModelInfo {
                name: name.to_string(),
                size: 0,
            })
            .collect();

        assert!(model_installed(&installed, "llama3"));
        assert!(model_installed(&installed, "llama3:8b"));
        assert!(model_installed(&installed, "nomic-embed-text"));
        assert!(!model_installed(&installed, "llama3:70b"));
        assert!(!model_installed(&installed, "llama"));
        assert!(!model_installed(&installed, "mistral"));
    }
}
