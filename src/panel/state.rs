//! Panel view state and chat transcript.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::aggregator::ContextGroup;

/// What the panel currently shows. Exactly one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViewState {
    Welcome,
    Loading,
    ContentCards { groups: Vec<ContextGroup> },
    ContentMarkdown { markdown: String },
    Error { message: String },
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::Welcome
    }
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Welcome => "welcome",
            ViewState::Loading => "loading",
            ViewState::ContentCards { .. } => "cards",
            ViewState::ContentMarkdown { .. } => "markdown",
            ViewState::Error { .. } => "error",
        }
    }

    pub fn is_cards(&self) -> bool {
        matches!(self, ViewState::ContentCards { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// In-memory transcript for one cards episode. Append-only until reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    messages: Vec<ChatMessage>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Start over with a fresh id
    pub fn reset(&mut self) {
        *self = ChatSession::new();
    }
}
