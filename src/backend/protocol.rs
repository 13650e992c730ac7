//! Context Engine Wire Types
//!
//! Request and reply bodies for the engine's JSON API. Field names are the
//! engine's snake_case names; do not rename.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::panel::state::ChatMessage;

pub const PATH_STATS: &str = "/context/stats";
pub const PATH_EXPLAIN: &str = "/explain";
pub const PATH_RETRIEVE: &str = "/context/retrieve";
pub const PATH_CHAT: &str = "/chat";
pub const PATH_SYNC: &str = "/context/sync";

/// Body of `/context/stats`. Replies are aligned to `snippets` by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsRequest {
    pub snippets: Vec<String>,
}

/// Discussion counts for one snippet
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsRecord {
    pub slack_count: u32,
    pub jira_count: u32,
    pub open_jira_count: u32,
}

impl StatsRecord {
    pub fn new(slack_count: u32, jira_count: u32, open_jira_count: u32) -> Self {
        Self { slack_count, jira_count, open_jira_count }
    }
}

/// Inclusive, 1-based line span shown to the engine as `"start-end"`,
/// also for a single line (`"7-7"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Body shared by `/explain` and `/context/retrieve`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionRequest {
    pub code_snippet: String,
    pub file_path: String,
    pub line_numbers: String,
}

impl SelectionRequest {
    pub fn new(code_snippet: &str, file_path: &str, lines: LineRange) -> Self {
        Self {
            code_snippet: code_snippet.to_string(),
            file_path: file_path.to_string(),
            line_numbers: lines.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplainReply {
    pub markdown: String,
}

/// One context object as the engine returns it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextObject {
    pub source: String,
    pub title_or_user: String,
    pub content_summary: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub relevance_score: f32,
    #[serde(default)]
    pub related_code_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub reply: String,
}

/// Reply of `/context/sync`.
///
/// The engine answers 200 even when the sync itself failed; `status` and
/// `message` carry that outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items_synced: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(u64),
    Failed(String),
    Skipped(String),
    /// Neither a count nor a failure status
    Invalid,
}

impl SyncReply {
    pub fn synced(items: u64) -> Self {
        Self {
            status: Some("success".to_string()),
            items_synced: Some(items),
            message: None,
        }
    }

    pub fn outcome(&self) -> SyncOutcome {
        let message = || self.message.clone().unwrap_or_else(|| "no details".to_string());
        match self.status.as_deref() {
            Some("error") => SyncOutcome::Failed(message()),
            Some("skipped") => SyncOutcome::Skipped(message()),
            _ => match self.items_synced {
                Some(n) => SyncOutcome::Synced(n),
                None => SyncOutcome::Invalid,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::state::ChatRole;
    use serde_json::json;

    #[test]
    fn test_line_range_display() {
        assert_eq!(LineRange::new(12, 18).to_string(), "12-18");
        assert_eq!(LineRange::new(7, 7).to_string(), "7-7");
        assert_eq!(LineRange::new(9, 3).to_string(), "3-9");
    }

    #[test]
    fn test_selection_request_shape() {
        let req = SelectionRequest::new("def f(): pass", "src/app.py", LineRange::new(1, 2));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"code_snippet": "def f(): pass", "file_path": "src/app.py", "line_numbers": "1-2"})
        );
    }

    #[test]
    fn test_context_object_optional_fields() {
        let obj: ContextObject = serde_json::from_value(json!({
            "source": "slack",
            "title_or_user": "alice",
            "content_summary": "we should cap retries"
        }))
        .unwrap();
        assert_eq!(obj.url, None);
        assert_eq!(obj.relevance_score, 0.0);
        assert!(obj.related_code_files.is_empty());
    }

    #[test]
    fn test_chat_request_history_roles() {
        let req = ChatRequest {
            message: "why?".into(),
            history: vec![
                ChatMessage::new(ChatRole::User, "what is this"),
                ChatMessage::new(ChatRole::Assistant, "a parser"),
            ],
            context: "JIRA: PAY-1".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["history"][0], json!({"role": "user", "content": "what is this"}));
        assert_eq!(value["history"][1]["role"], "assistant");
    }

    #[test]
    fn test_stats_record_rejects_negative_counts() {
        let parsed: Result<StatsRecord, _> =
            serde_json::from_value(json!({"slack_count": -1, "jira_count": 0, "open_jira_count": 0}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_sync_reply_outcomes() {
        let ok: SyncReply = serde_json::from_value(json!({"status": "success", "items_synced": 4})).unwrap();
        assert_eq!(ok.outcome(), SyncOutcome::Synced(4));

        let failed: SyncReply =
            serde_json::from_value(json!({"status": "error", "message": "Slack token revoked"})).unwrap();
        assert_eq!(failed.outcome(), SyncOutcome::Failed("Slack token revoked".into()));

        let skipped: SyncReply =
            serde_json::from_value(json!({"status": "skipped", "message": "Services not ready"})).unwrap();
        assert_eq!(skipped.outcome(), SyncOutcome::Skipped("Services not ready".into()));

        let empty: SyncReply = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.outcome(), SyncOutcome::Invalid);
    }
}
