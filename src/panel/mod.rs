//! Context Panel
//!
//! The single panel next to the editor: view state machine, chat
//! transcript, host events and HTML rendering.

pub mod controller;
pub mod events;
pub mod render;
pub mod state;

pub use controller::{Completion, PanelController, PanelError};
pub use events::{
    event_channel, EventReceiver, EventSender, HostMessage, Notification, NotificationLevel,
    PanelEvent,
};
pub use state::{ChatMessage, ChatRole, ChatSession, ViewState};
