//! Client-side chat history.
//!
//! A session always starts with one system message.  User turns are stored
//! as part lists so an uploaded image travels next to its text; clearing
//! the session keeps only the leading system message.

use std::fmt::Display;

use crate::types::{ChatMessage, ContentPart, Role};

#[derive(Debug, Clone)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            history: vec![ChatMessage::parts(
                Role::System,
                vec![ContentPart::text(system_prompt)],
            )],
        }
    }

    /// Append a user turn, optionally carrying an image retrieval URL.
    pub fn push_user(&mut self, text: impl Into<String>, image_url: Option<String>) {
        let text = text.into();
        let mut parts = Vec::with_capacity(2);
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }
        if let Some(url) = image_url {
            parts.push(ContentPart::image(url));
        }
        self.history.push(ChatMessage::parts(Role::User, parts));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.history.push(ChatMessage::text(Role::Assistant, text));
    }

    /// Record a failed send as an assistant message so it shows inline.
    pub fn push_error(&mut self, err: impl Display) {
        self.push_assistant(format!("Error: {err}"));
    }

    /// Drop everything except the leading system message.
    pub fn clear(&mut self) {
        self.history.truncate(1);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Number of non-system messages.
    pub fn turns(&self) -> usize {
        self.history.iter().filter(|m| m.role != Role::System).count()
    }
}
