//! Typed HTTP client for the relay's JSON API.

use std::path::Path;

use base64::Engine as _;
use nerd_core::{ChatMessage, ChatReply};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Server { status: StatusCode, message: String },

    #[error("cannot read image: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub model: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Uploaded {
    pub url: String,
    pub id: String,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        let resp = self.http.get(format!("{}/health", self.base_url)).send().await?;
        decode(resp).await
    }

    /// Upload a data URL; the returned URL is usable in an image part.
    pub async fn upload_image(&self, data_url: &str) -> Result<Uploaded, ClientError> {
        let resp = self
            .http
            .post(format!("{}/api/upload-image", self.base_url))
            .json(&serde_json::json!({ "image": data_url }))
            .send()
            .await?;
        decode(resp).await
    }

    /// Read an image file and upload it.
    pub async fn upload_file(&self, path: &Path) -> Result<Uploaded, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        self.upload_image(&to_data_url(path, &bytes)).await
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<ChatReply, ClientError> {
        let resp = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatBody { messages, model })
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(ClientError::Server { status, message })
}

/// Encode `bytes` as a data URL, guessing the MIME type from the extension.
pub fn to_data_url(path: &Path, bytes: &[u8]) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    };
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{b64}")
}

/// Text content of a reply message, for printing.
pub fn reply_text(reply: &ChatReply) -> &str {
    &reply.message.content
}

/// Extra fields of a reply (tool calls and the like), if any.
pub fn reply_extras(reply: &ChatReply) -> Option<&serde_json::Map<String, Value>> {
    (!reply.message.extra.is_empty()).then_some(&reply.message.extra)
}
