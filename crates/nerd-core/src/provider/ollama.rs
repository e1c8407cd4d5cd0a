//! Ollama completion provider.
//!
//! Talks to `POST {host}/api/chat` with `stream: false`, so the runtime
//! answers with exactly one JSON object once generation is finished.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::error::RelayError;

/// Default Ollama address.
pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";

/// Error body Ollama sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// [`CompletionProvider`] backed by a local Ollama runtime.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    host: String,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for `host` (e.g. `http://127.0.0.1:11434`).
    ///
    /// Only connecting is bounded in time; generation may take as long as
    /// the model needs.
    pub fn new(host: impl Into<String>) -> reqwest::Result<Self> {
        let host = host.into().trim_end_matches('/').to_owned();
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { host, http_client })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn endpoint(&self) -> String {
        self.host.clone()
    }

    async fn chat(&self, request: CompletionRequest) -> Result<CompletionResponse, RelayError> {
        debug!(model = %request.model, messages = request.messages.len(), "sending chat to Ollama");

        let response = self
            .http_client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::backend(format!("could not reach Ollama at {}: {e}", self.host)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(RelayError::backend(format!("Ollama returned {status}: {detail}")));
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| RelayError::backend(format!("invalid response from Ollama: {e}")))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
