//! Context Aggregation
//!
//! Groups context records by the system they came from, in the order the
//! panel shows them: Jira, Slack, Confluence, Notion, then anything else
//! alphabetically. Grouping is stable; records keep their engine order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::backend::protocol::ContextObject;

/// Where a context record came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextSource {
    Jira,
    Slack,
    Confluence,
    Notion,
    /// Unknown source, holding its upper-cased name
    Other(String),
}

impl ContextSource {
    /// Case-insensitive parse of the engine's `source` field
    pub fn parse(raw: &str) -> Self {
        let key = raw.trim().to_uppercase();
        match key.as_str() {
            "JIRA" => ContextSource::Jira,
            "SLACK" => ContextSource::Slack,
            "CONFLUENCE" => ContextSource::Confluence,
            "NOTION" => ContextSource::Notion,
            _ => ContextSource::Other(key),
        }
    }

    /// Normalized grouping key
    pub fn key(&self) -> &str {
        match self {
            ContextSource::Jira => "JIRA",
            ContextSource::Slack => "SLACK",
            ContextSource::Confluence => "CONFLUENCE",
            ContextSource::Notion => "NOTION",
            ContextSource::Other(key) => key,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ContextSource::Jira => "Jira",
            ContextSource::Slack => "Slack",
            ContextSource::Confluence => "Confluence",
            ContextSource::Notion => "Notion",
            ContextSource::Other(key) => key,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ContextSource::Jira => "🎫",
            ContextSource::Slack => "#",
            ContextSource::Confluence => "📘",
            ContextSource::Notion => "📓",
            ContextSource::Other(_) => "📄",
        }
    }

    /// Position in the fixed display order; unknown sources share the last slot
    fn rank(&self) -> usize {
        match self {
            ContextSource::Jira => 0,
            ContextSource::Slack => 1,
            ContextSource::Confluence => 2,
            ContextSource::Notion => 3,
            ContextSource::Other(_) => 4,
        }
    }

    fn sort_key(&self) -> (usize, &str) {
        (self.rank(), self.key())
    }
}

impl Serialize for ContextSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ContextSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(ContextSource::parse(&raw))
    }
}

/// One externally sourced discussion or document reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRecord {
    pub source: ContextSource,
    pub title_or_user: String,
    pub content_summary: String,
    pub url: Option<String>,
    #[serde(default)]
    pub relevance_score: f32,
    #[serde(default)]
    pub related_code_files: Vec<String>,
}

impl From<ContextObject> for ContextRecord {
    fn from(obj: ContextObject) -> Self {
        Self {
            source: ContextSource::parse(&obj.source),
            title_or_user: obj.title_or_user,
            content_summary: obj.content_summary,
            url: obj.url.filter(|u| !u.trim().is_empty()),
            relevance_score: obj.relevance_score,
            related_code_files: obj.related_code_files,
        }
    }
}

/// Records from one source, in engine order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextGroup {
    pub source: ContextSource,
    pub records: Vec<ContextRecord>,
}

impl ContextGroup {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Partition records by source and order the groups for display.
pub fn group<I>(records: I) -> Vec<ContextGroup>
where
    I: IntoIterator<Item = ContextRecord>,
{
    let mut groups: Vec<ContextGroup> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|g| g.source == record.source) {
            Some(existing) => existing.records.push(record),
            None => groups.push(ContextGroup {
                source: record.source.clone(),
                records: vec![record],
            }),
        }
    }

    groups.sort_by(|a, b| a.source.sort_key().cmp(&b.source.sort_key()));
    groups
}
