//! Items being classified and the links between them.
//!
//! Items are immutable once built. Parent relations are expressed by identifier
//! and only resolved afterwards by [`ItemForest::resolve`], so no item ever holds a
//! half-initialized back reference.

pub mod error;
pub mod forest;


pub use error::{KnowledgeError, KnowledgeResult};
pub use forest::ItemForest;

use serde::{Deserialize, Serialize};

use crate::hashing::normalize_line_endings;

/// Atomic unit of content: a whole artifact (granularity 0) or a fragment of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ItemRecord")]
pub struct Item {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    content: String,
    granularity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    compare: bool,
}

impl Item {
    /// Creates an item; `\r\n` in `content` is normalized to `\n`.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        content: &str,
        granularity: u32,
        parent_id: Option<String>,
        compare: bool,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            content: normalize_line_endings(content).into_owned(),
            granularity,
            parent_id,
            compare,
        }
    }

    /// A top-level artifact that takes part in classification.
    pub fn artifact(id: impl Into<String>, kind: impl Into<String>, content: &str) -> Self {
        Self::new(id, kind, content, 0, None, true)
    }

    /// A fragment of `parent_id` that takes part in classification.
    pub fn fragment(
        id: impl Into<String>,
        kind: impl Into<String>,
        content: &str,
        granularity: u32,
        parent_id: impl Into<String>,
    ) -> Self {
        Self::new(id, kind, content, granularity, Some(parent_id.into()), true)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type tag (e.g. `requirement`, `source file`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Normalized content.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn granularity(&self) -> u32 {
        self.granularity
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Whether this item participates in top-level classification.
    pub fn is_compare(&self) -> bool {
        self.compare
    }
}

#[derive(Deserialize)]
struct ItemRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    content: String,
    granularity: u32,
    #[serde(default)]
    parent_id: Option<String>,
    compare: bool,
}

impl From<ItemRecord> for Item {
    fn from(record: ItemRecord) -> Self {
        Item::new(
            record.id,
            record.kind,
            &record.content,
            record.granularity,
            record.parent_id,
            record.compare,
        )
    }
}

/// An established relation between two items (a verdict with confidence dropped).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceLink {
    pub source_id: String,
    pub target_id: String,
}

impl TraceLink {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
        }
    }
}

impl std::fmt::Display for TraceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source_id, self.target_id)
    }
}
