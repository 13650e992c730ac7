// ContextSync Library
// Exports the client core for use by both the editor host bridge and the CLI binary

pub mod aggregator;
pub mod annotations;
pub mod backend;
pub mod bridge;
pub mod config;
pub mod panel;
pub mod symbols;
pub mod telemetry;

// Re-export commonly used types
pub use aggregator::{group, ContextGroup, ContextRecord, ContextSource};
pub use annotations::{annotate, annotate_batch, Annotation, AnnotationCollector, IndexedAnnotation, Priority};
pub use backend::{BackendError, ContextBackend, HttpBackend, LineRange, StatsRecord};
pub use bridge::{Bridge, BridgeOutput, HostCommand, HostReply};
pub use config::{ConfigError, Settings};
pub use panel::{
    event_channel, ChatMessage, ChatRole, ChatSession, Completion, HostMessage, Notification,
    NotificationLevel, PanelController, PanelError, PanelEvent, ViewState,
};
pub use symbols::{extract_snippets, flatten_symbols, DocumentSymbol, Position, Snippet, SnippetBatch, SourceRange, SymbolKind};
