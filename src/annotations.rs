//! Inline Annotations
//!
//! Requests discussion stats for every function in a document in a single
//! round trip and turns each stats record into a code-lens style label.
//! Annotations are decoration only: any engine failure yields none.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::client::ContextBackend;
use crate::backend::protocol::{StatsRecord, StatsRequest};
use crate::config::Settings;
use crate::symbols::{SnippetBatch, SourceRange};

/// Open tickets at or above this count are high priority
pub const HIGH_PRIORITY_OPEN_TICKETS: u32 = 2;

const DEFAULT_TOOLTIP: &str = "ContextSync: Related discussions found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    None,
    Low,
    High,
}

impl Priority {
    /// Tier for a number of unresolved tickets
    pub fn from_open_tickets(open: u32) -> Self {
        if open >= HIGH_PRIORITY_OPEN_TICKETS {
            Priority::High
        } else if open >= 1 {
            Priority::Low
        } else {
            Priority::None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub label: String,
    pub tooltip: String,
    pub priority: Priority,
}

/// An annotation with the batch position and range it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedAnnotation {
    pub index: usize,
    pub range: SourceRange,
    pub annotation: Annotation,
}

/// Derive the annotation for one stats record.
///
/// Snippets without any Slack or Jira mentions get nothing, even if the
/// engine reports open tickets for them.
pub fn annotate(stats: &StatsRecord) -> Option<Annotation> {
    if stats.slack_count == 0 && stats.jira_count == 0 {
        return None;
    }

    let mut parts = Vec::with_capacity(2);
    if stats.slack_count > 0 {
        parts.push(format!("💬 {} Slack", stats.slack_count));
    }
    if stats.jira_count > 0 {
        parts.push(format!("🎫 {} Jira", stats.jira_count));
    }
    let base = parts.join("  ");

    let priority = Priority::from_open_tickets(stats.open_jira_count);
    let (icon, tier) = match priority {
        Priority::None => {
            return Some(Annotation {
                label: base,
                tooltip: DEFAULT_TOOLTIP.to_string(),
                priority,
            })
        }
        Priority::Low => ("⚠️", "Low Priority"),
        Priority::High => ("🔥", "High Priority"),
    };

    let mut label = format!("{} {} ({} Open)", icon, tier, stats.open_jira_count);
    if !base.is_empty() {
        label.push_str("  ");
        label.push_str(&base);
    }

    Some(Annotation {
        label,
        tooltip: format!(
            "Warning: {} Unresolved Jira Tickets detected!",
            stats.open_jira_count
        ),
        priority,
    })
}

/// Zip a batch with its stats reply by position.
///
/// A short reply leaves the tail unannotated; extra records are ignored.
pub fn annotate_batch(batch: &SnippetBatch, stats: &[StatsRecord]) -> Vec<IndexedAnnotation> {
    batch
        .iter()
        .zip(stats.iter())
        .enumerate()
        .filter_map(|(index, (snippet, record))| {
            annotate(record).map(|annotation| IndexedAnnotation {
                index,
                range: snippet.range,
                annotation,
            })
        })
        .collect()
}

/// Batches snippets into one stats call and derives annotations
#[derive(Clone)]
pub struct AnnotationCollector {
    backend: Arc<dyn ContextBackend>,
    enabled: bool,
}

impl AnnotationCollector {
    pub fn new(backend: Arc<dyn ContextBackend>, settings: &Settings) -> Self {
        Self {
            backend,
            enabled: settings.enable_code_lens,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Annotations for a batch, in batch order. Never fails.
    pub async fn compute_annotations(&self, batch: &SnippetBatch) -> Vec<IndexedAnnotation> {
        if !self.enabled {
            debug!("Annotations disabled");
            return Vec::new();
        }
        if batch.is_empty() {
            return Vec::new();
        }

        let request = StatsRequest { snippets: batch.texts() };
        let stats = match self.backend.stats(request).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(snippets = batch.len(), error = %e, "Stats request failed, no annotations");
                return Vec::new();
            }
        };

        if stats.len() < batch.len() {
            debug!(expected = batch.len(), received = stats.len(), "Short stats reply");
        }

        let annotations = annotate_batch(batch, &stats);
        info!(
            snippets = batch.len(),
            annotations = annotations.len(),
            "Computed annotations"
        );
        annotations
    }
}
