//! Panel Controller
//!
//! Owns the panel's single view slot and the chat transcript. Explain and
//! retrieve requests race for the slot: each captures a generation token
//! when issued, and its reply is applied only if no newer view change has
//! happened since. Chat replies and sync results never touch the slot.

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::events::{EventSender, HostMessage, Notification, PanelEvent};
use super::render;
use super::state::{ChatMessage, ChatSession, ViewState};
use crate::aggregator::{self, ContextRecord};
use crate::backend::client::{BackendError, ContextBackend};
use crate::backend::protocol::{ChatRequest, LineRange, SelectionRequest, SyncOutcome, SyncReply};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PanelError {
    #[error("Chat is only available while context cards are shown")]
    ChatUnavailable,
}

impl serde::Serialize for PanelError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// What happened to a view request's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer view change superseded this request
    Stale,
}

#[derive(Debug, Clone, Copy)]
enum ViewRequest {
    Explain,
    Retrieve,
}

struct PanelInner {
    view: ViewState,
    generation: u64,
    chat: ChatSession,
}

/// Single-slot, last-write-wins panel controller.
///
/// Cheap to clone; clones share the same panel. The lock is never held
/// across an await, so operations can run as independent tasks.
#[derive(Clone)]
pub struct PanelController {
    backend: Arc<dyn ContextBackend>,
    inner: Arc<Mutex<PanelInner>>,
    events: EventSender,
}

impl PanelController {
    pub fn new(backend: Arc<dyn ContextBackend>, events: EventSender) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(PanelInner {
                view: ViewState::Welcome,
                generation: 0,
                chat: ChatSession::new(),
            })),
            events,
        }
    }

    pub fn view(&self) -> ViewState {
        self.inner.lock().view.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn render_html(&self) -> String {
        render::render_html(&self.inner.lock().view)
    }

    pub fn chat_session(&self) -> ChatSession {
        self.inner.lock().chat.clone()
    }

    /// Plain text of the displayed cards; empty for any other view
    pub fn context_text(&self) -> String {
        match &self.inner.lock().view {
            ViewState::ContentCards { groups } => render::context_text(groups),
            _ => String::new(),
        }
    }

    // ============ VIEW TRANSITIONS ============

    /// Back to the welcome screen. Drops the chat and any in-flight view request.
    pub fn show_welcome(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.chat.reset();
        self.set_view(&mut inner, ViewState::Welcome);
    }

    pub fn show_loading(&self) {
        let mut inner = self.inner.lock();
        self.set_view(&mut inner, ViewState::Loading);
    }

    /// Ask the engine what the selection is for; shows markdown.
    ///
    /// The generation token is taken when this is called, not when the
    /// returned future is first polled, so spawn order does not matter.
    pub fn explain_intent(
        &self,
        snippet: &str,
        file_path: &str,
        lines: LineRange,
    ) -> impl Future<Output = Completion> + Send + 'static {
        let token = self.begin();
        let request = SelectionRequest::new(snippet, file_path, lines);
        debug!(file = %file_path, lines = %request.line_numbers, "Explain requested");
        let this = self.clone();

        async move {
            let view = match this.backend.explain(request).await {
                Ok(reply) => ViewState::ContentMarkdown { markdown: reply.markdown },
                Err(e) => error_view(ViewRequest::Explain, &e),
            };
            this.finish(token, view)
        }
    }

    /// Fetch context records for the selection; shows grouped cards.
    pub fn fetch_context(
        &self,
        snippet: &str,
        file_path: &str,
        lines: LineRange,
    ) -> impl Future<Output = Completion> + Send + 'static {
        let token = self.begin();
        let request = SelectionRequest::new(snippet, file_path, lines);
        debug!(file = %file_path, lines = %request.line_numbers, "Context requested");
        let this = self.clone();

        async move {
            let view = match this.backend.retrieve(request).await {
                Ok(objects) => {
                    let groups = aggregator::group(objects.into_iter().map(ContextRecord::from));
                    ViewState::ContentCards { groups }
                }
                Err(e) => error_view(ViewRequest::Retrieve, &e),
            };
            this.finish(token, view)
        }
    }

    fn begin(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let token = inner.generation;
        self.set_view(&mut inner, ViewState::Loading);
        token
    }

    fn finish(&self, token: u64, view: ViewState) -> Completion {
        let mut inner = self.inner.lock();
        if inner.generation != token {
            debug!(token, current = inner.generation, "Discarding superseded reply");
            return Completion::Stale;
        }
        if view.is_cards() {
            inner.chat.reset();
        }
        info!(view = view.name(), generation = token, "Panel updated");
        self.set_view(&mut inner, view);
        Completion::Applied
    }

    fn set_view(&self, inner: &mut PanelInner, view: ViewState) {
        let html = render::render_html(&view);
        inner.view = view.clone();
        let _ = self.events.send(PanelEvent::ViewChanged {
            generation: inner.generation,
            view,
            html,
        });
    }

    // ============ CHAT ============

    /// Host-side transcript echo. Only valid while cards are shown.
    pub fn record_chat(&self, message: ChatMessage) -> Result<(), PanelError> {
        let mut inner = self.inner.lock();
        if !inner.view.is_cards() {
            return Err(PanelError::ChatUnavailable);
        }
        inner.chat.push(message);
        Ok(())
    }

    pub fn new_chat(&self) {
        self.inner.lock().chat.reset();
    }

    /// Send one chat turn. The reply is delivered as `ChatReply` (or
    /// `ChatFailed`) in arrival order; the transcript is left to the host.
    pub fn chat(
        &self,
        message: &str,
        history: Vec<ChatMessage>,
        context_text: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send + 'static {
        let session_id = self.inner.lock().chat.id.clone();
        let request = ChatRequest {
            message: message.to_string(),
            history,
            context: context_text.to_string(),
        };
        debug!(session = %session_id, turns = request.history.len(), "Chat requested");
        let this = self.clone();

        async move {
            match this.backend.chat(request).await {
                Ok(reply) => {
                    let _ = this.events.send(PanelEvent::ChatReply {
                        session_id,
                        reply: reply.reply.clone(),
                    });
                    Ok(reply.reply)
                }
                Err(e) => {
                    warn!(session = %session_id, error = %e, "Chat failed");
                    let _ = this.events.send(PanelEvent::ChatFailed {
                        session_id,
                        message: chat_error_message(&e),
                    });
                    Err(e)
                }
            }
        }
    }

    // ============ SYNC ============

    /// Ask the engine to pull fresh Slack/Jira data. Reports via notification.
    pub fn trigger_sync(&self) -> impl Future<Output = Notification> + Send + 'static {
        let this = self.clone();
        async move {
            let result = this.backend.sync().await;
            if let Err(e) = &result {
                warn!(error = %e, "Sync failed");
            }
            let notification = sync_notification(&result);
            let _ = this.events.send(PanelEvent::Notification(notification.clone()));
            notification
        }
    }

    // ============ HOST MESSAGES ============

    /// Apply a webview message. Copy and new-chat take effect immediately;
    /// the returned future carries any network work.
    pub fn handle_message(&self, message: HostMessage) -> BoxFuture<'static, ()> {
        match message {
            HostMessage::Sync => self.trigger_sync().map(|_| ()).boxed(),
            HostMessage::Copy { text } => {
                let _ = self.events.send(PanelEvent::CopyToClipboard { text });
                let _ = self
                    .events
                    .send(PanelEvent::Notification(Notification::info("Copied to clipboard!")));
                future::ready(()).boxed()
            }
            HostMessage::Chat { text, history, context } => {
                let history = history.unwrap_or_else(|| self.chat_session().messages().to_vec());
                let context = context.unwrap_or_else(|| self.context_text());
                self.chat(&text, history, &context).map(|_| ()).boxed()
            }
            HostMessage::NewChat => {
                self.new_chat();
                future::ready(()).boxed()
            }
        }
    }
}

fn error_view(request: ViewRequest, err: &BackendError) -> ViewState {
    warn!(request = ?request, error = %err, "View request failed");
    ViewState::Error { message: view_error_message(request, err) }
}

fn view_error_message(request: ViewRequest, err: &BackendError) -> String {
    match err {
        BackendError::Unreachable(_) => {
            "Context Engine Disconnected. Is the Python server running?".to_string()
        }
        BackendError::Timeout => "Context engine timed out.".to_string(),
        BackendError::Status(code) => format!("Error: Server returned {}", code),
        BackendError::Decode(_) => match request {
            ViewRequest::Explain => "Failed to parse response.".to_string(),
            ViewRequest::Retrieve => "Failed to parse context response.".to_string(),
        },
    }
}

fn chat_error_message(err: &BackendError) -> String {
    match err {
        BackendError::Unreachable(_) | BackendError::Timeout => "Server unreachable.".to_string(),
        BackendError::Status(code) => format!("Error: {}", code),
        BackendError::Decode(_) => "Failed to parse response.".to_string(),
    }
}

fn sync_notification(result: &Result<SyncReply, BackendError>) -> Notification {
    match result {
        Ok(reply) => match reply.outcome() {
            SyncOutcome::Synced(n) => Notification::info(format!("Synced {} items from Slack/Jira", n)),
            SyncOutcome::Failed(message) => Notification::error(format!("Sync failed: {}", message)),
            SyncOutcome::Skipped(message) => Notification::warning(format!("Sync skipped: {}", message)),
            SyncOutcome::Invalid => Notification::warning("Sync completed but response was invalid."),
        },
        Err(BackendError::Decode(_)) => Notification::warning("Sync completed but response was invalid."),
        Err(BackendError::Status(code)) => Notification::error(format!("Sync failed: {}", code)),
        Err(BackendError::Unreachable(_)) | Err(BackendError::Timeout) => {
            Notification::error("Sync failed: Server unreachable")
        }
    }
}
