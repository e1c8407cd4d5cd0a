//! Completion provider capability.
//!
//! The relay never talks to a model runtime directly; it hands a batch of
//! normalized messages to a [`CompletionProvider`] and relays the single
//! answer.  [`ollama::OllamaProvider`] is the production implementation;
//! tests substitute a fake.

pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RelayError;
use crate::types::BackendMessage;

/// One non-streaming chat call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<BackendMessage>,
    /// Tool definitions, forwarded untouched.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tools: Option<Value>,
    pub stream: bool,
    /// How long the runtime keeps the model loaded; `-1` keeps it forever.
    pub keep_alive: i64,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<BackendMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            stream: false,
            keep_alive: -1,
        }
    }

    pub fn with_tools(mut self, tools: Option<Value>) -> Self {
        self.tools = tools;
        self
    }
}

/// The assistant message as returned by the runtime.
///
/// Fields other than `role` and `content` (tool calls, thinking, ...) are
/// kept in `extra` so they reach the caller unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
            extra: Map::new(),
        }
    }
}

/// The runtime's single answer to a [`CompletionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    /// RFC 3339 timestamp as reported by the runtime.
    pub created_at: String,
    pub message: ResponseMessage,
    #[serde(default)]
    pub done: bool,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Human-readable provider name, used in logs and error hints.
    fn name(&self) -> &'static str;

    /// Where the provider sends requests, for remediation messages.
    fn endpoint(&self) -> String;

    async fn chat(&self, request: CompletionRequest) -> Result<CompletionResponse, RelayError>;
}
