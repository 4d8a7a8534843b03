//! Interaction state machine for the mind-map editor.
//!
//! The controller owns the graph model and only remembers which element the
//! user is acting on. Pointer events come in from the rendering surface;
//! every graph change goes through `GraphModel` so its invariants hold.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auto_layout::AutoLayout;
use crate::content::{ContentLookup, ContentRef};
use crate::error::{EditorError, GraphError};
use crate::graph::{GraphEdge, GraphModel, GraphNode, NodeKind, NodePatch, Position, CHILD_OFFSET_X};

pub type EditorResult<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EditorState {
    #[default]
    Idle,
    NodeSelected { node: String },
    Connecting { source: String },
}

/// Events delivered by the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerEvent {
    Click { node: String },
    DoubleClick { node: String },
    /// A node was dragged to a new position.
    Drag { node: String, to: Position },
    /// A connection was drawn handle-to-handle, bypassing connecting mode.
    ConnectDrag { source: String, target: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorOutcome {
    Selected(String),
    Connected(GraphEdge),
    Moved(String),
    /// Double click: the caller should show these attachments.
    OpenAttachments { node: String, attachments: Vec<ContentRef> },
    Ignored,
}

/// Two clicks on the same node within `double_click_ms` count as a double click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickPolicy {
    pub double_click_ms: u64,
}

impl Default for ClickPolicy {
    fn default() -> Self {
        Self { double_click_ms: 300 }
    }
}

pub struct GraphEditorController {
    model: GraphModel,
    state: EditorState,
    policy: ClickPolicy,
    layout: AutoLayout,
    lookup: Option<Box<dyn ContentLookup + Send>>,
    last_click: Option<(String, u64)>,
}

impl GraphEditorController {
    pub fn new(model: GraphModel) -> Self {
        Self {
            model,
            state: EditorState::Idle,
            policy: ClickPolicy::default(),
            layout: AutoLayout::default(),
            lookup: None,
            last_click: None,
        }
    }

    pub fn with_policy(mut self, policy: ClickPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_layout(mut self, layout: AutoLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_lookup<L: ContentLookup + Send + 'static>(mut self, lookup: L) -> Self {
        self.lookup = Some(Box::new(lookup));
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn into_model(self) -> GraphModel {
        self.model
    }

    pub fn selected(&self) -> Option<&str> {
        match &self.state {
            EditorState::NodeSelected { node } => Some(node),
            _ => None,
        }
    }

    fn require_node(&self, id: &str) -> EditorResult<()> {
        if self.model.node(id).is_some() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id.to_string()).into())
        }
    }

    fn require_selected(&self) -> EditorResult<String> {
        self.selected().map(str::to_string).ok_or(EditorError::NothingSelected)
    }

    pub fn handle(&mut self, event: PointerEvent) -> EditorResult<EditorOutcome> {
        match event {
            PointerEvent::Click { node } => self.click(&node),
            PointerEvent::DoubleClick { node } => self.double_click(&node),
            PointerEvent::Drag { node, to } => {
                if self.model.set_position(&node, to) {
                    Ok(EditorOutcome::Moved(node))
                } else {
                    Err(GraphError::UnknownNode(node).into())
                }
            }
            PointerEvent::ConnectDrag { source, target } => {
                let edge = self.model.connect(&source, &target)?;
                Ok(EditorOutcome::Connected(edge))
            }
        }
    }

    /// Single click. Selects the node, or completes a pending connection.
    pub fn click(&mut self, node: &str) -> EditorResult<EditorOutcome> {
        self.require_node(node)?;
        match &self.state {
            EditorState::Connecting { source } if source == node => Ok(EditorOutcome::Ignored),
            EditorState::Connecting { source } => {
                let edge = self.model.connect(source, node)?;
                debug!(edge = %edge.id, "connection completed");
                self.state = EditorState::Idle;
                Ok(EditorOutcome::Connected(edge))
            }
            EditorState::Idle | EditorState::NodeSelected { .. } => {
                self.state = EditorState::NodeSelected { node: node.to_string() };
                Ok(EditorOutcome::Selected(node.to_string()))
            }
        }
    }

    /// Timestamped click, classified through the click policy. The second
    /// click of a double click opens attachments and never completes a connection.
    pub fn click_at(&mut self, node: &str, timestamp_ms: u64) -> EditorResult<EditorOutcome> {
        if let Some((last, at)) = self.last_click.take() {
            if last == node && timestamp_ms.saturating_sub(at) <= self.policy.double_click_ms {
                return self.double_click(node);
            }
        }
        let outcome = self.click(node)?;
        self.last_click = Some((node.to_string(), timestamp_ms));
        Ok(outcome)
    }

    pub fn double_click(&mut self, node: &str) -> EditorResult<EditorOutcome> {
        let attachments = self
            .model
            .node(node)
            .map(|n| n.attachments.clone())
            .ok_or_else(|| GraphError::UnknownNode(node.to_string()))?;
        Ok(EditorOutcome::OpenAttachments {
            node: node.to_string(),
            attachments,
        })
    }

    pub fn select(&mut self, node: &str) -> EditorResult<()> {
        self.require_node(node)?;
        self.state = EditorState::NodeSelected { node: node.to_string() };
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.state = EditorState::Idle;
        self.last_click = None;
    }

    pub fn start_connecting(&mut self) -> EditorResult<()> {
        let source = self.require_selected()?;
        self.state = EditorState::Connecting { source };
        Ok(())
    }

    /// Add a node and select it. With a node selected the new one becomes its
    /// child, placed to the right of it unless a position is given.
    pub fn add_node(&mut self, kind: NodeKind, label: &str, position: Option<Position>) -> EditorResult<GraphNode> {
        let parent = self.selected().map(str::to_string);
        let position = match (position, parent.as_deref().and_then(|p| self.model.node(p))) {
            (Some(p), _) => p,
            (None, Some(parent)) => Position::new(parent.position.x + CHILD_OFFSET_X, parent.position.y),
            (None, None) => Position::default(),
        };
        let node = self.model.add_node(kind, label, position, parent.as_deref())?;
        self.state = EditorState::NodeSelected { node: node.id.clone() };
        Ok(node)
    }

    pub fn delete_selected(&mut self) -> EditorResult<bool> {
        let node = self.require_selected()?;
        let removed = self.model.delete_node(&node);
        self.state = EditorState::Idle;
        Ok(removed)
    }

    /// Delete any node. If the editor was pointing at it, it returns to Idle.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let removed = self.model.delete_node(id);
        let points_here = match &self.state {
            EditorState::NodeSelected { node } => node == id,
            EditorState::Connecting { source } => source == id,
            EditorState::Idle => false,
        };
        if points_here {
            self.state = EditorState::Idle;
        }
        removed
    }

    pub fn update_selected(&mut self, patch: &NodePatch) -> EditorResult<()> {
        let node = self.require_selected()?;
        if self.model.update_node(&node, patch) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node).into())
        }
    }

    /// Resolve `ids` through the content lookup and attach the hits to the
    /// selected node, replacing what it had. Returns how many were attached.
    pub fn attach_content(&mut self, ids: &[String]) -> EditorResult<usize> {
        let node = self.require_selected()?;
        let refs: Vec<ContentRef> = match &self.lookup {
            Some(lookup) => ids
                .iter()
                .filter_map(|id| {
                    let hit = lookup.get(id);
                    if hit.is_none() {
                        warn!(content = %id, "unknown content id, skipped");
                    }
                    hit
                })
                .collect(),
            None => {
                warn!("no content lookup configured, nothing attached");
                Vec::new()
            }
        };
        let count = refs.len();
        if !self.model.attach_content(&node, refs) {
            return Err(GraphError::UnknownNode(node).into());
        }
        Ok(count)
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        self.model.remove_edge(id)
    }

    pub fn auto_layout(&mut self) {
        self.layout.reflow_in_place(&mut self.model);
    }
}
