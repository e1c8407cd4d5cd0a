//! Chat message shapes: what the widget sends, and what the backend expects.

use serde::{Deserialize, Deserializer, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Tool results, for conversations that carry a `tools` list.
    Tool,
}

/// One unit of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text {
        #[serde(default, deserialize_with = "null_as_empty")]
        text: String,
    },
    Image {
        /// Retrieval URL into the image store, an external URL, or a data URL.
        /// A part without one fails resolution like any other bad reference.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Any part type the relay does not understand; ignored on normalization.
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::Image { url: Some(url.into()) }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Message body: either plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A message as held in the widget's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    /// `None` when the widget sent no content (or `null`).
    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl ChatMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    pub fn parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Parts(parts)),
        }
    }
}

/// A message in the shape the model runtime accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub role: Role,
    /// Never empty; a single space stands in for missing text.
    pub content: String,
    /// Base64 payloads without any data-URL prefix.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub images: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_content_deserializes_as_text() {
        let msg: ChatMessage =
            serde_json::from_value(json!({ "role": "user", "content": "hello" })).unwrap();
        assert_eq!(msg, ChatMessage::text(Role::User, "hello"));
    }

    #[test]
    fn part_list_deserializes_in_order() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                { "type": "text", "text": "look" },
                { "type": "image", "url": "/api/images/abc" },
                { "type": "text" }
            ]
        }))
        .unwrap();
        assert_eq!(
            msg.content,
            Some(MessageContent::Parts(vec![
                ContentPart::text("look"),
                ContentPart::image("/api/images/abc"),
                ContentPart::text(""),
            ]))
        );
    }

    #[test]
    fn null_text_and_missing_url_still_parse() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                { "type": "text", "text": null },
                { "type": "image" },
                { "type": "image", "url": null }
            ]
        }))
        .unwrap();
        assert_eq!(
            msg.content,
            Some(MessageContent::Parts(vec![
                ContentPart::text(""),
                ContentPart::Image { url: None },
                ContentPart::Image { url: None },
            ]))
        );
    }

    #[test]
    fn unknown_part_type_is_tolerated() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [{ "type": "audio", "data": "..." }]
        }))
        .unwrap();
        assert_eq!(
            msg.content,
            Some(MessageContent::Parts(vec![ContentPart::Unsupported]))
        );
    }

    #[test]
    fn null_or_missing_content_is_none() {
        let a: ChatMessage = serde_json::from_value(json!({ "role": "system" })).unwrap();
        let b: ChatMessage =
            serde_json::from_value(json!({ "role": "system", "content": null })).unwrap();
        assert!(a.content.is_none());
        assert!(b.content.is_none());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let res: Result<ChatMessage, _> =
            serde_json::from_value(json!({ "role": "narrator", "content": "x" }));
        assert!(res.is_err());
    }

    #[test]
    fn backend_message_omits_absent_images() {
        let msg = BackendMessage {
            role: Role::User,
            content: "hi".into(),
            images: None,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, json!({ "role": "user", "content": "hi" }));
    }
}
