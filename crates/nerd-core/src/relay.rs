//! The chat relay: normalize history, call the provider once, pass the
//! answer back.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::error::RelayError;
use crate::normalize::Normalizer;
use crate::provider::{CompletionProvider, CompletionRequest, ResponseMessage};
use crate::store::ImageStore;
use crate::types::ChatMessage;

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "gemma3n";

/// Characters of the reply echoed into the log.
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Value>,
    pub model: Option<String>,
}

/// What the caller gets back: the runtime's answer, relayed verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: ResponseMessage,
    pub model: String,
    pub created_at: String,
    pub done: bool,
}

/// Owns everything a chat call needs.  Cheap to share behind an `Arc`.
pub struct ChatRelay {
    normalizer: Normalizer,
    provider: Arc<dyn CompletionProvider>,
    default_model: String,
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRelay")
            .field("provider", &self.provider.name())
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ChatRelay {
    pub fn new(normalizer: Normalizer, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            normalizer,
            provider,
            default_model: DEFAULT_MODEL.to_owned(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn images(&self) -> &ImageStore {
        self.normalizer.store()
    }

    pub fn provider(&self) -> &dyn CompletionProvider {
        self.provider.as_ref()
    }

    pub async fn chat(&self, req: RelayRequest) -> Result<ChatReply, RelayError> {
        let started = Instant::now();
        let model = req
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());
        info!(messages = req.messages.len(), model = %model, "chat request");

        let messages = self.normalizer.normalize(&req.messages).await?;
        let request = CompletionRequest::new(model, messages).with_tools(req.tools);

        let response = self.provider.chat(request).await.inspect_err(|e| {
            error!(provider = self.provider.name(), error = %e, "chat failed");
        })?;

        let preview: String = response.message.content.chars().take(PREVIEW_CHARS).collect();
        info!(
            model = %response.model,
            latency_ms = started.elapsed().as_millis() as u64,
            preview = %preview,
            "chat reply received"
        );

        Ok(ChatReply {
            message: response.message,
            model: response.model,
            created_at: response.created_at,
            done: true,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
