//! Intermediate tree that every strategy positions before it is flattened
//! into graph records. Truncation and content attachment happen here, once,
//! so the strategies only deal with geometry.

use crate::category::{CategoryNode, CategoryTree};
use crate::content::{ContentLookup, ContentRef};
use crate::error::Result;
use crate::graph::{edge_id, EdgeOrigin, Graph, GraphEdge, GraphNode, NodeKind, Position, Style, Truncation};
use crate::utils::estimate_node_width;

use super::LayoutOptions;

pub(crate) const ROOT_ID: &str = "root";

#[derive(Debug, Clone)]
pub(crate) struct PlanNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub level: u32,
    pub count: u32,
    pub path: Vec<String>,
    pub truncated: Option<Truncation>,
    pub attachments: Vec<ContentRef>,
    pub position: Position,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn new(id: String, kind: NodeKind, label: String, level: u32) -> Self {
        Self {
            id,
            kind,
            label,
            level,
            count: 0,
            path: Vec::new(),
            truncated: None,
            attachments: Vec::new(),
            position: Position::default(),
            children: Vec::new(),
        }
    }

    pub fn root(options: &LayoutOptions) -> Self {
        Self::new(ROOT_ID.to_string(), NodeKind::Root, options.root_label.clone(), 0)
    }

    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(|c| c.leaf_count()).sum()
        }
    }

    /// Summary node standing in for `hidden` categories below `parent_id`.
    pub fn more(parent_id: &str, level: u32, hidden: &[&CategoryNode]) -> Self {
        let truncation = Truncation {
            categories: hidden.iter().map(|c| c.subtree_size()).sum(),
            content: hidden.iter().map(|c| c.subtree_count()).sum(),
        };
        Self::more_with(parent_id, level, truncation)
    }

    pub fn more_with(parent_id: &str, level: u32, truncation: Truncation) -> Self {
        let hidden = if truncation.categories > 0 {
            truncation.categories
        } else {
            truncation.content as usize
        };
        let mut node = Self::new(
            format!("more-{}", parent_id),
            NodeKind::More,
            format!("more… ({})", hidden),
            level,
        );
        node.count = truncation.content;
        node.truncated = Some(truncation);
        node
    }
}

pub(crate) struct PlanBuilder<'a> {
    options: &'a LayoutOptions,
    lookup: Option<&'a dyn ContentLookup>,
    max_depth: u32,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(options: &'a LayoutOptions, lookup: Option<&'a dyn ContentLookup>) -> Self {
        Self {
            options,
            lookup,
            max_depth: options.max_depth.max(1),
        }
    }

    /// Validate `tree` and expand it under a (possibly hidden) root node.
    pub fn build(&self, tree: &CategoryTree) -> Result<PlanNode> {
        tree.validate()?;
        let mut root = PlanNode::root(self.options);
        root.count = tree.roots.iter().map(|c| c.count).sum();
        root.children = self.expand(&tree.roots, ROOT_ID, 1, &[]);
        Ok(root)
    }

    fn expand(&self, cats: &[CategoryNode], parent_id: &str, level: u32, parent_path: &[String]) -> Vec<PlanNode> {
        let mut out = Vec::with_capacity(cats.len());
        let mut folded: Vec<&CategoryNode> = Vec::new();

        for cat in cats {
            if level == self.max_depth && !cat.is_leaf() {
                folded.push(cat);
                continue;
            }
            let id = format!("cat-{}", cat.id);
            let mut node = PlanNode::new(id.clone(), NodeKind::Category, cat.name.clone(), level);
            node.count = cat.count;
            node.path = parent_path.to_vec();
            node.path.push(cat.name.clone());

            if cat.is_leaf() {
                if level < self.max_depth {
                    node.children = self.content_leaves(&id, &cat.name, level + 1);
                }
            } else {
                node.children = self.expand(&cat.children, &cat.id, level + 1, &node.path);
            }
            out.push(node);
        }

        if !folded.is_empty() {
            let mut more = PlanNode::more(parent_id, level, &folded);
            more.path = parent_path.to_vec();
            out.push(more);
        }
        out
    }

    fn content_leaves(&self, parent_id: &str, tag: &str, level: u32) -> Vec<PlanNode> {
        let Some(lookup) = self.lookup else {
            return Vec::new();
        };
        lookup
            .tagged(tag)
            .into_iter()
            .take(self.options.items_per_category)
            .map(|item| content_node(parent_id, item, level))
            .collect()
    }
}

pub(crate) fn content_node(parent_id: &str, item: ContentRef, level: u32) -> PlanNode {
    let mut node = PlanNode::new(
        format!("content-{}-{}", parent_id, item.id),
        NodeKind::Content,
        item.title.clone(),
        level,
    );
    node.attachments.push(item);
    node
}

/// Flatten a positioned plan into graph records, parents before children.
pub(crate) fn emit(root: PlanNode, include_root: bool) -> Graph {
    let mut graph = Graph::new();
    if include_root {
        push(&mut graph, root, None);
    } else {
        for child in root.children {
            push(&mut graph, child, None);
        }
    }
    graph
}

fn push(graph: &mut Graph, mut node: PlanNode, parent: Option<&str>) {
    let children = std::mem::take(&mut node.children);
    let id = node.id.clone();
    if let Some(parent) = parent {
        graph.edges.push(GraphEdge {
            id: edge_id(parent, &id),
            source: parent.to_string(),
            target: id.clone(),
            style: Style::new(),
            label: None,
            origin: EdgeOrigin::Generated,
        });
    }
    graph.nodes.push(into_record(node));
    for child in children {
        push(graph, child, Some(&id));
    }
}

fn into_record(node: PlanNode) -> GraphNode {
    let mut record = GraphNode::new(node.id, node.kind, node.label, node.position, node.level);
    record
        .style
        .insert("minWidth".to_string(), serde_json::json!(estimate_node_width(&record.label)));
    record.count = node.count;
    record.path = node.path;
    record.truncated = node.truncated;
    record.attachments = node.attachments;
    record
}
