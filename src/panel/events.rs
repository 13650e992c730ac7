//! Panel Events
//!
//! Everything the controller tells the host goes out as a `PanelEvent` on an
//! unbounded tokio channel; the host's UI messages come in as `HostMessage`.
//! View changes, chat replies and notifications are separate variants so a
//! chat reply never has to replace the panel content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::state::{ChatMessage, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// One-shot toast, independent of the panel content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

/// Controller → host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelEvent {
    /// The panel content was replaced; `html` is ready to drop into the webview.
    ViewChanged {
        generation: u64,
        view: ViewState,
        html: String,
    },
    /// Assistant reply for a chat request. The host re-enables its input.
    ChatReply { session_id: String, reply: String },
    /// Chat request failed. The host re-enables its input for a retry.
    ChatFailed { session_id: String, message: String },
    Notification(Notification),
    CopyToClipboard { text: String },
}

/// Named UI events raised by the panel's webview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostMessage {
    Sync,
    Copy {
        text: String,
    },
    Chat {
        text: String,
        /// Prior turns; the controller's recorded transcript when absent
        #[serde(default)]
        history: Option<Vec<ChatMessage>>,
        /// Context the user is looking at; the controller's cards when absent
        #[serde(default)]
        context: Option<String>,
    },
    NewChat,
}

pub type EventSender = mpsc::UnboundedSender<PanelEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PanelEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
