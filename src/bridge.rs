//! Host Bridge
//!
//! Line-oriented JSON protocol between an editor extension and this
//! process. The extension writes one `HostCommand` per line; we answer with
//! `PanelEvent`s and `HostReply`s, one JSON object per line.
//!
//! Commands are dispatched in arrival order. Anything that touches the view
//! slot is issued synchronously here, so a later command always supersedes
//! an earlier one even though their network calls run as separate tasks.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::annotations::{AnnotationCollector, IndexedAnnotation};
use crate::backend::client::ContextBackend;
use crate::backend::protocol::LineRange;
use crate::config::Settings;
use crate::panel::{ChatMessage, EventSender, HostMessage, PanelController, PanelEvent};
use crate::symbols::{extract_snippets, DocumentSymbol};

/// Extension → bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    Welcome,
    Loading,
    Explain {
        snippet: String,
        file_path: String,
        lines: LineRange,
    },
    Context {
        snippet: String,
        file_path: String,
        lines: LineRange,
    },
    /// A UI event forwarded from the panel webview
    Panel { message: HostMessage },
    RecordChat { message: ChatMessage },
    /// Compute code-lens annotations for a document
    Annotations {
        uri: String,
        text: String,
        symbols: Vec<DocumentSymbol>,
    },
}

/// Bridge → extension, for anything that is not a panel event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostReply {
    Annotations {
        uri: String,
        annotations: Vec<IndexedAnnotation>,
    },
    Rejected { error: String },
}

/// One line of bridge output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BridgeOutput {
    Panel(PanelEvent),
    Reply(HostReply),
}

pub type ReplySender = mpsc::UnboundedSender<HostReply>;

#[derive(Clone)]
pub struct Bridge {
    panel: PanelController,
    collector: AnnotationCollector,
    snippet_max_lines: u32,
    replies: ReplySender,
}

impl Bridge {
    pub fn new(
        backend: Arc<dyn ContextBackend>,
        settings: &Settings,
        events: EventSender,
        replies: ReplySender,
    ) -> Self {
        Self {
            panel: PanelController::new(backend.clone(), events),
            collector: AnnotationCollector::new(backend, settings),
            snippet_max_lines: settings.snippet_max_lines,
            replies,
        }
    }

    pub fn panel(&self) -> &PanelController {
        &self.panel
    }

    /// Read commands until EOF, spawning their network work.
    ///
    /// Bad lines are rejected and skipped; only an I/O error on the reader
    /// ends the loop early.
    pub async fn serve<R>(&self, mut reader: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }
            let Some(command) = self.parse_bytes(&buf) else {
                continue;
            };
            if let Some(work) = self.dispatch(command) {
                tokio::spawn(work);
            }
        }
    }

    /// Like `parse`, for a raw line that may not be UTF-8. Blank lines are
    /// skipped without a reply.
    pub fn parse_bytes(&self, raw: &[u8]) -> Option<HostCommand> {
        match std::str::from_utf8(raw) {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => self.parse(line),
            Err(e) => {
                warn!(error = %e, bytes = raw.len(), "Rejected non-UTF-8 host command");
                self.reply(HostReply::Rejected { error: format!("Invalid command: {}", e) });
                None
            }
        }
    }

    /// Parse one input line. Errors are reported back to the host.
    pub fn parse(&self, line: &str) -> Option<HostCommand> {
        match serde_json::from_str(line) {
            Ok(command) => Some(command),
            Err(e) => {
                warn!(error = %e, "Rejected host command");
                self.reply(HostReply::Rejected { error: format!("Invalid command: {}", e) });
                None
            }
        }
    }

    /// Apply a command. Returns the remaining network work, if any, for the
    /// caller to spawn.
    pub fn dispatch(&self, command: HostCommand) -> Option<BoxFuture<'static, ()>> {
        match command {
            HostCommand::Welcome => {
                self.panel.show_welcome();
                None
            }
            HostCommand::Loading => {
                self.panel.show_loading();
                None
            }
            HostCommand::Explain { snippet, file_path, lines } => {
                let pending = self.panel.explain_intent(&snippet, &file_path, lines);
                Some(pending.map(|_| ()).boxed())
            }
            HostCommand::Context { snippet, file_path, lines } => {
                let pending = self.panel.fetch_context(&snippet, &file_path, lines);
                Some(pending.map(|_| ()).boxed())
            }
            HostCommand::Panel { message } => Some(self.panel.handle_message(message)),
            HostCommand::RecordChat { message } => {
                if let Err(e) = self.panel.record_chat(message) {
                    self.reply(HostReply::Rejected { error: e.to_string() });
                }
                None
            }
            HostCommand::Annotations { uri, text, symbols } => {
                let batch = extract_snippets(&text, &symbols, self.snippet_max_lines);
                debug!(uri = %uri, snippets = batch.len(), "Annotations requested");
                let collector = self.collector.clone();
                let replies = self.replies.clone();
                Some(
                    async move {
                        let annotations = collector.compute_annotations(&batch).await;
                        let _ = replies.send(HostReply::Annotations { uri, annotations });
                    }
                    .boxed(),
                )
            }
        }
    }

    fn reply(&self, reply: HostReply) {
        let _ = self.replies.send(reply);
    }
}
