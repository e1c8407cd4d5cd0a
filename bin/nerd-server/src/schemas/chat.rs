use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use nerd_core::ChatReply;

/// Request body for `POST /api/chat`.
///
/// `messages` is kept as raw JSON so that a non-list value can be reported
/// as a 400 instead of a generic deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation history: `{role, content}` where `content` is a string
    /// or a list of `{type: "text", text}` / `{type: "image", url}` parts.
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub messages: Value,
    /// Tool definitions forwarded to the model runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub tools: Option<Value>,
    /// Model to use instead of the server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Response body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Assistant message exactly as the runtime returned it.
    #[schema(value_type = Object)]
    pub message: Value,
    /// Model that produced the answer.
    pub model: String,
    /// Creation timestamp reported by the runtime.
    pub created_at: String,
    /// Always `true`; responses are never streamed.
    pub done: bool,
}

impl TryFrom<ChatReply> for ChatResponse {
    type Error = serde_json::Error;

    fn try_from(reply: ChatReply) -> Result<Self, Self::Error> {
        Ok(Self {
            message: serde_json::to_value(reply.message)?,
            model: reply.model,
            created_at: reply.created_at,
            done: reply.done,
        })
    }
}
