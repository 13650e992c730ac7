//! Scripted engine for unit tests.
//!
//! Each operation pops the next scripted reply when it is called. A gated
//! reply stays pending until the test sends on its oneshot, which lets tests
//! choose the order in which concurrent requests complete.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

use super::client::{BackendError, ContextBackend};
use super::protocol::{
    ChatReply, ChatRequest, ContextObject, ExplainReply, SelectionRequest, StatsRecord,
    StatsRequest, SyncReply,
};

pub(crate) type Reply<T> = Result<T, BackendError>;

enum Scripted<T> {
    Ready(Reply<T>),
    Gated(oneshot::Receiver<Reply<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Reply<T> {
        match self {
            Scripted::Ready(reply) => reply,
            Scripted::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(BackendError::Unreachable("gate dropped".into()))),
        }
    }
}

struct Queue<T>(Mutex<VecDeque<Scripted<T>>>);

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Queue(Mutex::new(VecDeque::new()))
    }
}

impl<T: Send + 'static> Queue<T> {
    fn ready(&self, reply: Reply<T>) {
        self.0.lock().push_back(Scripted::Ready(reply));
    }

    fn gate(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.0.lock().push_back(Scripted::Gated(rx));
        tx
    }

    fn next(&self) -> BoxFuture<'static, Reply<T>> {
        let scripted = self
            .0
            .lock()
            .pop_front()
            .unwrap_or_else(|| Scripted::Ready(Err(BackendError::Unreachable("nothing scripted".into()))));
        scripted.resolve().boxed()
    }
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    stats: Queue<Vec<StatsRecord>>,
    explain: Queue<ExplainReply>,
    retrieve: Queue<Vec<ContextObject>>,
    chat: Queue<ChatReply>,
    sync: Queue<SyncReply>,
    pub stats_requests: Mutex<Vec<StatsRequest>>,
    pub selection_requests: Mutex<Vec<SelectionRequest>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn push_stats(&self, reply: Reply<Vec<StatsRecord>>) {
        self.stats.ready(reply);
    }

    pub fn push_explain(&self, reply: Reply<ExplainReply>) {
        self.explain.ready(reply);
    }

    pub fn gate_explain(&self) -> oneshot::Sender<Reply<ExplainReply>> {
        self.explain.gate()
    }

    pub fn push_retrieve(&self, reply: Reply<Vec<ContextObject>>) {
        self.retrieve.ready(reply);
    }

    pub fn gate_retrieve(&self) -> oneshot::Sender<Reply<Vec<ContextObject>>> {
        self.retrieve.gate()
    }

    pub fn push_chat(&self, reply: Reply<ChatReply>) {
        self.chat.ready(reply);
    }

    pub fn gate_chat(&self) -> oneshot::Sender<Reply<ChatReply>> {
        self.chat.gate()
    }

    pub fn push_sync(&self, reply: Reply<SyncReply>) {
        self.sync.ready(reply);
    }
}

impl ContextBackend for ScriptedBackend {
    fn stats(&self, request: StatsRequest) -> BoxFuture<'_, Reply<Vec<StatsRecord>>> {
        self.stats_requests.lock().push(request);
        self.stats.next()
    }

    fn explain(&self, request: SelectionRequest) -> BoxFuture<'_, Reply<ExplainReply>> {
        self.selection_requests.lock().push(request);
        self.explain.next()
    }

    fn retrieve(&self, request: SelectionRequest) -> BoxFuture<'_, Reply<Vec<ContextObject>>> {
        self.selection_requests.lock().push(request);
        self.retrieve.next()
    }

    fn chat(&self, request: ChatRequest) -> BoxFuture<'_, Reply<ChatReply>> {
        self.chat_requests.lock().push(request);
        self.chat.next()
    }

    fn sync(&self) -> BoxFuture<'_, Reply<SyncReply>> {
        self.sync.next()
    }
}
