use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

pub const CONTENT_VERSION: &str = "1.0";

fn default_version() -> String {
    CONTENT_VERSION.to_string()
}

/// Saved diagram body: the graph records plus a format version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MindMapContent {
    #[serde(flatten)]
    pub graph: Graph,
    #[serde(default = "default_version")]
    pub version: String,
}

impl MindMapContent {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MindMapRecord {
    /// Row id; 0 until the record has been stored.
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    pub content: MindMapContent,
}

impl MindMapRecord {
    pub fn new(title: impl Into<String>, graph: Graph) -> Self {
        Self {
            id: 0,
            title: title.into(),
            description: None,
            tags: Vec::new(),
            starred: false,
            shared: false,
            creator: None,
            view_count: 0,
            updated_at: Utc::now(),
            content: MindMapContent::new(graph),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}
