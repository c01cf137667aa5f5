//! HTTP page fetcher.

use async_trait::async_trait;
use neogpt_core::{Error, Fetcher, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("neogpt/", env!("CARGO_PKG_VERSION"));

/// Largest body accepted from one page.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// [`Fetcher`] over plain HTTP(S) GET requests.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_body: MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }
}

fn fetch_error(url: &str, message: impl std::fmt::Display) -> Error {
    Error::Fetch {
        url: url.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(url, format!("HTTP {}", status)));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_body as u64 {
                return Err(too_large(url, self.max_body));
            }
        }

        // Content-Length may be absent.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| fetch_error(url, e))? {
            if body.len() + chunk.len() > self.max_body {
                return Err(too_large(url, self.max_body));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn too_large(url: &str, limit: usize) -> Error {
    fetch_error(url, format!("body exceeds the {} byte limit", limit))
}
