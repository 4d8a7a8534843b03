//! Category tree → positioned node/edge graph.
//!
//! Four strategies share one pipeline: the tree is validated and expanded
//! into a plan (truncation and content leaves applied), the strategy assigns
//! positions, and the plan is flattened into graph records. Generation is a
//! pure function of its inputs; ids are derived from category and content
//! ids, never from clocks or counters.

mod circular;
mod force;
mod items;
mod plan;
mod radial;
mod tree;

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::{debug, info};

use crate::category::CategoryTree;
use crate::content::{ContentLookup, ContentRef, ItemQuery};
use crate::error::Result;
use crate::graph::{Graph, Position};

use plan::{PlanBuilder, PlanNode};

/// Geometry constants shared by the strategies.
pub mod constants {
    /// Fraction of a parent's angular slot handed to its children, leaving a gap between wedges.
    pub const WEDGE_FILL: f64 = 0.8;

    /// Angular width of the arc content items fan out on around their tag node.
    pub const CONTENT_ARC: f64 = std::f64::consts::FRAC_PI_2;
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Radial,
    Tree,
    #[serde(alias = "force")]
    ForceApprox,
    Circular,
}

impl LayoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutKind::Radial => "radial",
            LayoutKind::Tree => "tree",
            LayoutKind::ForceApprox => "forceapprox",
            LayoutKind::Circular => "circular",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "radial" => Some(LayoutKind::Radial),
            "tree" => Some(LayoutKind::Tree),
            "force" | "forceapprox" | "force-approx" => Some(LayoutKind::ForceApprox),
            "circular" => Some(LayoutKind::Circular),
            _ => None,
        }
    }

    pub fn all() -> [LayoutKind; 4] {
        [LayoutKind::Radial, LayoutKind::Tree, LayoutKind::ForceApprox, LayoutKind::Circular]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    pub center: Position,
    /// Horizontal distance between neighbouring leaves (tree layout).
    pub node_spacing: f64,
    /// Vertical distance between levels (tree layout).
    pub level_spacing: f64,
    /// Ring radius of the top-level categories (R1).
    pub radius: f64,
    /// Distance from a category to its children, as a fraction of R1.
    /// Applied again at every deeper level.
    pub child_radius_ratio: f64,
    /// Deepest category level rendered; root is level 0. Clamped to at least 1.
    pub max_depth: u32,
    pub include_root: bool,
    pub root_label: String,
    /// Arc bounds for the circular layout, in radians.
    pub start_angle: f64,
    pub end_angle: f64,
    /// Radius of the half-arc children sit on in the force approximation,
    /// and of the content fan in item-based maps.
    pub arc_radius: f64,
    pub max_tags: usize,
    pub items_per_tag: usize,
    /// Content leaves attached to each leaf category when a lookup is given.
    pub items_per_category: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            center: Position::default(),
            node_spacing: 180.0,
            level_spacing: 150.0,
            radius: 250.0,
            child_radius_ratio: 0.5,
            max_depth: 3,
            include_root: true,
            root_label: "Knowledge Map".to_string(),
            start_angle: 0.0,
            end_angle: TAU,
            arc_radius: 150.0,
            max_tags: 10,
            items_per_tag: 3,
            items_per_category: 3,
        }
    }
}

pub struct LayoutGenerator;

impl LayoutGenerator {
    pub fn generate(tree: &CategoryTree, kind: LayoutKind, options: &LayoutOptions) -> Result<Graph> {
        Self::run(tree, kind, options, None)
    }

    /// Like `generate`, with content leaves hung under every rendered leaf
    /// category whose name matches a content tag.
    pub fn generate_with_content(
        tree: &CategoryTree,
        kind: LayoutKind,
        options: &LayoutOptions,
        lookup: &dyn ContentLookup,
    ) -> Result<Graph> {
        Self::run(tree, kind, options, Some(lookup))
    }

    /// Tag-centred map over a flat content list: the most frequent tags of the
    /// matching items around the root, a few items fanned out behind each tag.
    pub fn generate_from_items(items: &[ContentRef], query: &ItemQuery, options: &LayoutOptions) -> Graph {
        let graph = items::generate(items, query, options);
        info!(
            items = items.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "item map generated"
        );
        graph
    }

    fn run(
        tree: &CategoryTree,
        kind: LayoutKind,
        options: &LayoutOptions,
        lookup: Option<&dyn ContentLookup>,
    ) -> Result<Graph> {
        let mut root = PlanBuilder::new(options, lookup).build(tree)?;
        place(&mut root, kind, options);
        let graph = plan::emit(root, options.include_root);
        debug!(layout = kind.as_str(), categories = tree.len(), "layout placed");
        info!(
            layout = kind.as_str(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph generated"
        );
        Ok(graph)
    }
}

fn place(root: &mut PlanNode, kind: LayoutKind, options: &LayoutOptions) {
    match kind {
        LayoutKind::Radial => radial::place(root, options),
        LayoutKind::Tree => tree::place(root, options),
        LayoutKind::ForceApprox => force::place(root, options),
        LayoutKind::Circular => circular::place(root, options),
    }
}
