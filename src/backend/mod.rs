//! Context Engine Integration
//!
//! Wire types and the HTTP client for the engine that does retrieval,
//! summarization and chat.

pub mod client;
pub mod protocol;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{BackendError, ContextBackend, HttpBackend};
pub use protocol::{
    ChatReply, ChatRequest, ContextObject, ExplainReply, LineRange, SelectionRequest,
    StatsRecord, StatsRequest, SyncOutcome, SyncReply,
};
