//! Mutable graph backing the interactive editor.
//!
//! Every operation validates before it mutates, so a rejected call leaves
//! the graph exactly as it was.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::debug;
use uuid::Uuid;

use super::models::{EdgeOrigin, Graph, GraphEdge, GraphNode, NodeKind, Position, Style};
use crate::content::ContentRef;
use crate::error::{GraphError, Result};

/// Horizontal offset of a node added as a child of an existing node.
pub const CHILD_OFFSET_X: f64 = 250.0;

/// Supplies ids for nodes created interactively.
pub trait IdSource {
    fn next_node_id(&mut self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_node_id(&mut self) -> String {
        format!("node-{}", Uuid::new_v4())
    }
}

/// Predictable ids (`n1`, `n2`, ...) for tests and scripted sessions.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdSource for SequentialIds {
    fn next_node_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Partial node update. `None` leaves a field alone; an empty string clears
/// notes/icon/url. Style keys are merged, and a JSON `null` removes a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub style: Option<Style>,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub struct GraphModel {
    graph: Graph,
    ids: Box<dyn IdSource + Send>,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::with_ids(UuidIds)
    }

    pub fn with_ids<I: IdSource + Send + 'static>(ids: I) -> Self {
        Self {
            graph: Graph::new(),
            ids: Box::new(ids),
        }
    }

    /// Take ownership of an existing graph after checking its invariants.
    pub fn load(graph: Graph) -> Result<Self> {
        Self::load_with_ids(graph, UuidIds)
    }

    pub fn load_with_ids<I: IdSource + Send + 'static>(graph: Graph, ids: I) -> Result<Self> {
        graph.validate()?;
        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "graph loaded");
        Ok(Self {
            graph,
            ids: Box::new(ids),
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.graph.node(id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.graph.edge(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Create a node, and an edge from `parent` to it when a parent is given.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: &str,
        position: Position,
        parent: Option<&str>,
    ) -> Result<GraphNode> {
        let parent_node = match parent {
            Some(pid) => Some(
                self.graph
                    .node(pid)
                    .ok_or_else(|| GraphError::InvalidParent(pid.to_string()))?
                    .clone(),
            ),
            None => None,
        };
        if kind == NodeKind::Root {
            if let Some(existing) = self.graph.root() {
                return Err(GraphError::RootExists(existing.id.clone()));
            }
        }

        let id = self.ids.next_node_id();
        if self.graph.contains_node(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        let level = parent_node.as_ref().map(|p| p.level + 1).unwrap_or(0);
        let mut node = GraphNode::new(id.clone(), kind, label, position, level);
        if let Some(p) = &parent_node {
            node.path = p.path.clone();
            if kind == NodeKind::Category {
                node.path.push(label.to_string());
            }
        }

        let edge = parent_node.as_ref().map(|p| GraphEdge {
            id: self.graph.unique_edge_id(&p.id, &id),
            source: p.id.clone(),
            target: id.clone(),
            style: Style::new(),
            label: None,
            origin: EdgeOrigin::User,
        });

        self.graph.nodes.push(node.clone());
        if let Some(edge) = edge {
            self.graph.edges.push(edge);
        }
        debug!(node = %id, parent = ?parent, "node added");
        Ok(node)
    }

    /// Remove a node and every edge touching it. Unknown ids are a no-op.
    pub fn delete_node(&mut self, id: &str) -> bool {
        if !self.graph.contains_node(id) {
            return false;
        }
        let before = self.graph.edges.len();
        self.graph.nodes.retain(|n| n.id != id);
        self.graph.edges.retain(|e| !e.touches(id));
        debug!(node = %id, edges_removed = before - self.graph.edges.len(), "node deleted");
        true
    }

    /// Delete `id` and everything reachable from it along outgoing edges.
    /// Returns how many nodes were removed.
    pub fn delete_subtree(&mut self, id: &str) -> usize {
        if !self.graph.contains_node(id) {
            return 0;
        }
        let doomed = self.reachable(id);
        self.graph.nodes.retain(|n| !doomed.contains(&n.id));
        self.graph
            .edges
            .retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));
        debug!(node = %id, removed = doomed.len(), "subtree deleted");
        doomed.len()
    }

    /// Apply `patch`. Relabelling a category also rewrites the matching
    /// segment of `path` on the node and everything below it.
    pub fn update_node(&mut self, id: &str, patch: &NodePatch) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        let mut renamed: Option<(Vec<String>, Vec<String>)> = None;
        if let Some(label) = &patch.label {
            let names_self =
                node.kind == NodeKind::Category && node.path.last() == Some(&node.label);
            if names_self && *label != node.label {
                let old_path = node.path.clone();
                let mut new_path = old_path.clone();
                if let Some(last) = new_path.last_mut() {
                    *last = label.clone();
                }
                renamed = Some((old_path, new_path));
            }
            node.label = label.clone();
        }
        if let Some(notes) = &patch.notes {
            node.notes = non_empty(notes);
        }
        if let Some(icon) = &patch.icon {
            node.icon = non_empty(icon);
        }
        if let Some(url) = &patch.url {
            node.url = non_empty(url);
        }
        if let Some(style) = &patch.style {
            for (key, value) in style {
                if value.is_null() {
                    node.style.remove(key);
                } else {
                    node.style.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some((old_path, new_path)) = renamed {
            self.rewrite_paths(id, &old_path, &new_path);
        }
        debug!(node = %id, "node updated");
        true
    }

    /// `id` plus every node reachable from it along outgoing edges.
    fn reachable(&self, id: &str) -> HashSet<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([id.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for child in self.graph.outgoing(&current) {
                if !seen.contains(child) {
                    queue.push_back(child.to_string());
                }
            }
        }
        seen
    }

    /// Replace the `old` prefix of `path` with `new` on `id` and everything below it.
    fn rewrite_paths(&mut self, id: &str, old: &[String], new: &[String]) {
        let seen = self.reachable(id);
        for node in self.graph.nodes.iter_mut().filter(|n| seen.contains(&n.id)) {
            if node.path.starts_with(old) {
                let rest = node.path.split_off(old.len());
                node.path = new.iter().cloned().chain(rest).collect();
            }
        }
    }

    /// Replace the node's attachment list. Content existence is not checked here.
    pub fn attach_content(&mut self, id: &str, refs: Vec<ContentRef>) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        debug!(node = %id, count = refs.len(), "content attached");
        node.attachments = refs;
        true
    }

    pub fn set_position(&mut self, id: &str, position: Position) -> bool {
        match self.graph.node_mut(id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Draw an edge `source -> target`. Connecting an already connected pair
    /// returns the existing edge unchanged.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<GraphEdge> {
        if source == target {
            return Err(GraphError::SelfLoop(source.to_string()));
        }
        for end in [source, target] {
            if !self.graph.contains_node(end) {
                return Err(GraphError::UnknownNode(end.to_string()));
            }
        }
        if let Some(existing) = self.graph.find_edge(source, target) {
            return Ok(existing.clone());
        }

        let edge = GraphEdge {
            id: self.graph.unique_edge_id(source, target),
            source: source.to_string(),
            target: target.to_string(),
            style: Style::new(),
            label: None,
            origin: EdgeOrigin::User,
        };
        self.graph.edges.push(edge.clone());
        debug!(edge = %edge.id, "nodes connected");
        Ok(edge)
    }

    /// Remove the edge between `source` and `target`, if any.
    pub fn disconnect(&mut self, source: &str, target: &str) -> bool {
        let before = self.graph.edges.len();
        self.graph
            .edges
            .retain(|e| !(e.source == source && e.target == target));
        before != self.graph.edges.len()
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        let before = self.graph.edges.len();
        self.graph.edges.retain(|e| e.id != id);
        before != self.graph.edges.len()
    }

    /// Move one or both endpoints of an edge. Same checks as `connect`; if the
    /// new pair already has an edge, this edge is dropped in favour of it.
    pub fn reconnect_edge(
        &mut self,
        edge_id: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<GraphEdge> {
        let current = self
            .graph
            .edge(edge_id)
            .ok_or_else(|| GraphError::UnknownEdge(edge_id.to_string()))?
            .clone();
        let new_source = source.unwrap_or(&current.source).to_string();
        let new_target = target.unwrap_or(&current.target).to_string();

        if new_source == new_target {
            return Err(GraphError::SelfLoop(new_source));
        }
        for end in [&new_source, &new_target] {
            if !self.graph.contains_node(end) {
                return Err(GraphError::UnknownNode(end.clone()));
            }
        }
        if let Some(existing) = self.graph.find_edge(&new_source, &new_target) {
            if existing.id != current.id {
                let existing = existing.clone();
                self.remove_edge(edge_id);
                return Ok(existing);
            }
        }

        let edge = self
            .graph
            .edges
            .iter_mut()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::UnknownEdge(edge_id.to_string()))?;
        edge.source = new_source;
        edge.target = new_target;
        Ok(edge.clone())
    }

    /// Every edge where `id` is source or target.
    pub fn edges_of(&self, id: &str) -> Vec<&GraphEdge> {
        self.graph.edges.iter().filter(|e| e.touches(id)).collect()
    }

    pub fn root(&self) -> Option<&GraphNode> {
        self.graph.root()
    }

    pub fn children(&self, id: &str) -> Vec<&GraphNode> {
        self.graph
            .outgoing(id)
            .into_iter()
            .filter_map(|t| self.graph.node(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn model() -> GraphModel {
        GraphModel::with_ids(SequentialIds::new("n"))
    }

    /// root n1 with children n2, n3; n3 has child n4.
    fn small_tree() -> GraphModel {
        let mut m = model();
        m.add_node(NodeKind::Root, "Map", Position::default(), None).unwrap();
        m.add_node(NodeKind::Category, "A", Position::new(250.0, 0.0), Some("n1")).unwrap();
        m.add_node(NodeKind::Category, "B", Position::new(250.0, 100.0), Some("n1")).unwrap();
        m.add_node(NodeKind::Content, "B.1", Position::new(500.0, 100.0), Some("n3")).unwrap();
        m
    }

    fn assert_invariants(g: &Graph) {
        assert!(g.validate().is_ok(), "invariants violated: {:?}", g.validate());
    }

    #[test]
    fn test_add_node_with_parent_creates_edge() {
        let m = small_tree();
        assert_eq!(m.node_count(), 4);
        assert_eq!(m.edge_count(), 3);
        let n4 = m.node("n4").unwrap();
        assert_eq!(n4.level, 2);
        assert_eq!(n4.path, vec!["B".to_string()]);
        assert!(m.graph().find_edge("n3", "n4").is_some());

        let kids: Vec<&str> = m.children("n1").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(kids, vec!["n2", "n3"]);
        assert_eq!(m.root().map(|n| n.id.as_str()), Some("n1"));
    }

    #[test]
    fn test_add_node_invalid_parent_is_rejected() {
        let mut m = small_tree();
        let err = m
            .add_node(NodeKind::Category, "X", Position::default(), Some("ghost"))
            .unwrap_err();
        assert_eq!(err, GraphError::InvalidParent("ghost".to_string()));
        assert_eq!(m.node_count(), 4);
    }

    #[test]
    fn test_second_root_is_rejected() {
        let mut m = small_tree();
        let err = m.add_node(NodeKind::Root, "Again", Position::default(), None).unwrap_err();
        assert!(matches!(err, GraphError::RootExists(_)));
    }

    #[test]
    fn test_cascade_delete_removes_exactly_incident_edges() {
        let mut m = small_tree();
        m.connect("n2", "n4").unwrap();
        // n3: n1->n3, n3->n4
        let degree = m.edges_of("n3").len();
        assert_eq!(degree, 2);
        let before = m.edge_count();
        assert!(m.delete_node("n3"));
        assert_eq!(m.edge_count(), before - degree);
        assert!(m.graph().find_edge("n2", "n4").is_some());
        assert_invariants(m.graph());
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut m = small_tree();
        assert!(!m.delete_node("nope"));
        assert_eq!(m.node_count(), 4);
    }

    #[test]
    fn test_delete_subtree() {
        let mut m = small_tree();
        assert_eq!(m.delete_subtree("n3"), 2);
        assert_eq!(m.node_count(), 2);
        assert_eq!(m.edge_count(), 1);
        assert_invariants(m.graph());
    }

    #[test]
    fn test_update_node_patch() {
        let mut m = small_tree();
        let mut style = Style::new();
        style.insert("background".into(), serde_json::json!("#ffcc00"));
        let patch = NodePatch {
            label: Some("Renamed".into()),
            notes: Some("remember".into()),
            url: Some("https://example.org".into()),
            style: Some(style),
            ..Default::default()
        };
        assert!(m.update_node("n2", &patch));
        let n = m.node("n2").unwrap();
        assert_eq!(n.label, "Renamed");
        assert_eq!(n.kind, NodeKind::Category);
        assert_eq!(n.url.as_deref(), Some("https://example.org"));
        assert_eq!(n.style["background"], "#ffcc00");

        let mut clear = Style::new();
        clear.insert("background".into(), serde_json::Value::Null);
        let patch = NodePatch {
            url: Some(String::new()),
            style: Some(clear),
            ..Default::default()
        };
        assert!(m.update_node("n2", &patch));
        let n = m.node("n2").unwrap();
        assert!(n.url.is_none());
        assert!(n.style.is_empty());
        assert!(!m.update_node("ghost", &NodePatch::label("x")));
    }

    #[test]
    fn test_relabel_category_rewrites_paths_below_it() {
        let mut m = model();
        m.add_node(NodeKind::Root, "Map", Position::default(), None).unwrap();
        m.add_node(NodeKind::Category, "Math", Position::default(), Some("n1")).unwrap();
        m.add_node(NodeKind::Category, "Algebra", Position::default(), Some("n2")).unwrap();
        m.add_node(NodeKind::Content, "Notes", Position::default(), Some("n3")).unwrap();
        m.add_node(NodeKind::Category, "Physics", Position::default(), Some("n1")).unwrap();

        assert!(m.update_node("n2", &NodePatch::label("Mathematics")));
        assert_eq!(m.node("n2").unwrap().path, vec!["Mathematics"]);
        assert_eq!(m.node("n3").unwrap().path, vec!["Mathematics", "Algebra"]);
        assert_eq!(m.node("n4").unwrap().path, vec!["Mathematics", "Algebra"]);
        assert_eq!(m.node("n5").unwrap().path, vec!["Physics"]);

        // content labels are not part of any path
        assert!(m.update_node("n4", &NodePatch::label("Slides")));
        assert_eq!(m.node("n4").unwrap().path, vec!["Mathematics", "Algebra"]);
    }

    #[test]
    fn test_attach_content_replaces_list() {
        let mut m = small_tree();
        assert!(m.attach_content("n2", vec![ContentRef::new("m1", "Notes", &[])]));
        assert!(m.attach_content("n2", vec![ContentRef::new("m2", "Slides", &[])]));
        let atts = &m.node("n2").unwrap().attachments;
        assert_eq!(atts.len(), 1);
        assert_eq!(atts[0].id, "m2");
        assert!(!m.attach_content("ghost", vec![]));
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut m = small_tree();
        let first = m.connect("n2", "n3").unwrap();
        let second = m.connect("n2", "n3").unwrap();
        assert_eq!(first.id, second.id);
        let between = m
            .graph()
            .edges
            .iter()
            .filter(|e| e.source == "n2" && e.target == "n3")
            .count();
        assert_eq!(between, 1);
    }

    #[test]
    fn test_connect_rejects_self_loop_and_unknown() {
        let mut m = small_tree();
        let before = m.edge_count();
        assert_eq!(m.connect("n2", "n2"), Err(GraphError::SelfLoop("n2".into())));
        assert_eq!(m.connect("n2", "zz"), Err(GraphError::UnknownNode("zz".into())));
        assert_eq!(m.edge_count(), before);
    }

    #[test]
    fn test_disconnect_and_remove_edge() {
        let mut m = small_tree();
        let e = m.connect("n2", "n4").unwrap();
        assert!(m.disconnect("n2", "n4"));
        assert!(!m.disconnect("n2", "n4"));
        assert!(m.edge(&e.id).is_none());
        assert!(m.remove_edge("edge-n1-n2"));
        assert!(!m.remove_edge("edge-n1-n2"));
    }

    #[test]
    fn test_reconnect_edge() {
        let mut m = small_tree();
        let moved = m.reconnect_edge("edge-n3-n4", Some("n2"), None).unwrap();
        assert_eq!(moved.id, "edge-n3-n4");
        assert_eq!(moved.source, "n2");
        assert_eq!(
            m.reconnect_edge("edge-n3-n4", None, Some("n2")),
            Err(GraphError::SelfLoop("n2".into()))
        );
        // Connecting the original pair again must not collide with the moved edge's id.
        let fresh = m.connect("n3", "n4").unwrap();
        assert_eq!(fresh.id, "edge-n3-n4-2");
        assert_invariants(m.graph());

        // Reconnecting onto an existing pair folds into that edge.
        let folded = m.reconnect_edge("edge-n3-n4-2", Some("n2"), None).unwrap();
        assert_eq!(folded.id, "edge-n3-n4");
        assert!(m.edge("edge-n3-n4-2").is_none());
    }

    #[test]
    fn test_load_rejects_invalid_graph() {
        let mut g = small_tree().into_graph();
        g.edges[0].target = "missing".into();
        assert!(GraphModel::load(g).is_err());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize),
        AddOrphan,
        Delete(usize),
        Connect(usize, usize),
        RemoveEdge(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..16).prop_map(Op::Add),
            Just(Op::AddOrphan),
            (0usize..16).prop_map(Op::Delete),
            (0usize..16, 0usize..16).prop_map(|(a, b)| Op::Connect(a, b)),
            (0usize..16).prop_map(Op::RemoveEdge),
        ]
    }

    fn pick_node(m: &GraphModel, i: usize) -> Option<String> {
        let nodes = &m.graph().nodes;
        if nodes.is_empty() {
            None
        } else {
            Some(nodes[i % nodes.len()].id.clone())
        }
    }

    proptest! {
        #[test]
        fn mutations_preserve_invariants(ops in prop::collection::vec(op(), 1..60)) {
            let mut m = model();
            m.add_node(NodeKind::Root, "Map", Position::default(), None).unwrap();
            for op in ops {
                match op {
                    Op::Add(i) => {
                        let parent = pick_node(&m, i);
                        let _ = m.add_node(NodeKind::Category, "x", Position::default(), parent.as_deref());
                    }
                    Op::AddOrphan => {
                        let _ = m.add_node(NodeKind::Content, "free", Position::default(), None);
                    }
                    Op::Delete(i) => {
                        if let Some(id) = pick_node(&m, i) {
                            let degree = m.edges_of(&id).len();
                            let before = m.edge_count();
                            prop_assert!(m.delete_node(&id));
                            prop_assert_eq!(m.edge_count(), before - degree);
                        }
                    }
                    Op::Connect(a, b) => {
                        if let (Some(s), Some(t)) = (pick_node(&m, a), pick_node(&m, b)) {
                            let before = m.edge_count();
                            let res = m.connect(&s, &t);
                            if s == t {
                                prop_assert!(res.is_err());
                                prop_assert_eq!(m.edge_count(), before);
                            }
                        }
                    }
                    Op::RemoveEdge(i) => {
                        let edges = &m.graph().edges;
                        if !edges.is_empty() {
                            let id = edges[i % edges.len()].id.clone();
                            prop_assert!(m.remove_edge(&id));
                        }
                    }
                }
                let g = m.graph();
                prop_assert!(g.validate().is_ok());
                let ids: HashSet<&str> = g.edges.iter().map(|e| e.id.as_str()).collect();
                prop_assert_eq!(ids.len(), g.edges.len());
            }
        }
    }
}
