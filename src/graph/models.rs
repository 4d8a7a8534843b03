use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::content::ContentRef;
use crate::error::{GraphError, Result};

/// Opaque presentation hints. The engine merges these on update but never reads them.
pub type Style = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Category,
    Content,
    /// Summary leaf standing in for a truncated subtree.
    More,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Category => "category",
            NodeKind::Content => "content",
            NodeKind::More => "more",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from `self` in direction `angle` (radians).
    pub fn polar(&self, angle: f64, radius: f64) -> Self {
        Self {
            x: self.x + radius * angle.cos(),
            y: self.y + radius * angle.sin(),
        }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// What a `More` node hides.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Truncation {
    pub categories: usize,
    pub content: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub position: Position,
    pub level: u32,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub attachments: Vec<ContentRef>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Content count carried over from the category tree.
    #[serde(default)]
    pub count: u32,
    /// Category names from the top level down to this node.
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub truncated: Option<Truncation>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>, position: Position, level: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            position,
            level,
            style: Style::new(),
            attachments: Vec::new(),
            url: None,
            notes: None,
            icon: None,
            count: 0,
            path: Vec::new(),
            truncated: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EdgeOrigin {
    /// Created by a layout generator.
    Generated,
    /// Drawn by the user in the editor.
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub label: Option<String>,
    pub origin: EdgeOrigin,
}

impl GraphEdge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Canonical id for the edge `source -> target`.
pub fn edge_id(source: &str, target: &str) -> String {
    format!("edge-{}-{}", source, target)
}

/// Node/edge records keyed by unique id. Insertion order is kept so sibling
/// order (and therefore layout) is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn find_edge(&self, source: &str, target: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.source == source && e.target == target)
    }

    /// The node of kind `Root`, if the graph has one.
    pub fn root(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Root)
    }

    /// Targets of edges leaving `id`, in edge insertion order.
    pub fn outgoing(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target.as_str())
            .collect()
    }

    pub fn incoming(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Flat record view handed to the rendering surface.
    pub fn records(&self) -> (&[GraphNode], &[GraphEdge]) {
        (&self.nodes, &self.edges)
    }

    /// `edge_id(source, target)`, suffixed if that id is already taken.
    pub fn unique_edge_id(&self, source: &str, target: &str) -> String {
        let base = edge_id(source, target);
        if self.edge(&base).is_none() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.edge(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Check every structural invariant: unique ids, at most one root,
    /// no self-loops, and no edge pointing at a missing node.
    pub fn validate(&self) -> Result<()> {
        let mut node_ids: HashSet<&str> = HashSet::new();
        let mut roots = 0;
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
            if node.kind == NodeKind::Root {
                roots += 1;
                if roots > 1 {
                    return Err(GraphError::RootExists(node.id.clone()));
                }
            }
        }

        let mut edge_ids: HashSet<&str> = HashSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(GraphError::DuplicateEdge(edge.id.clone()));
            }
            if edge.source == edge.target {
                return Err(GraphError::SelfLoop(edge.source.clone()));
            }
            for end in [&edge.source, &edge.target] {
                if !node_ids.contains(end.as_str()) {
                    return Err(GraphError::UnknownNode(end.clone()));
                }
            }
        }
        Ok(())
    }
}
