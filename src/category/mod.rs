//! Category trees: the hierarchical input to the layout generators.
//!
//! All layout strategies walk the tree through the small set of traversal
//! primitives defined here (`preorder`, `subtree_size`, `leaf_count`,
//! `path_to`, `find`) instead of re-implementing recursion at each call site.

pub mod source;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{GraphError, Result};

/// Hard cap on tree depth. Anything deeper is treated as malformed input.
pub const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default, alias = "subcategories")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, count: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            count,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<CategoryNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of category nodes in this subtree, including `self`.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_size()).sum::<usize>()
    }

    /// Number of leaves under this node; a leaf counts itself.
    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(|c| c.leaf_count()).sum()
        }
    }

    /// Sum of content counts over the whole subtree.
    pub fn subtree_count(&self) -> u32 {
        self.count + self.children.iter().map(|c| c.subtree_count()).sum::<u32>()
    }

    /// Depth of the deepest descendant relative to this node (a leaf is 1).
    pub fn height(&self) -> usize {
        1 + self.children.iter().map(|c| c.height()).max().unwrap_or(0)
    }
}

/// Ordered list of top-level categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTree {
    pub roots: Vec<CategoryNode>,
}

impl CategoryTree {
    pub fn new(roots: Vec<CategoryNode>) -> Self {
        Self { roots }
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of category nodes across all top-level trees.
    pub fn len(&self) -> usize {
        self.roots.iter().map(|r| r.subtree_size()).sum()
    }

    pub fn height(&self) -> usize {
        self.roots.iter().map(|r| r.height()).max().unwrap_or(0)
    }

    /// Visit every node depth-first, parents before children. `depth` is 1 for
    /// top-level categories. Fails once the walk goes past `MAX_TREE_DEPTH`.
    pub fn preorder<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&CategoryNode, usize),
    {
        fn walk<F: FnMut(&CategoryNode, usize)>(
            node: &CategoryNode,
            depth: usize,
            visit: &mut F,
        ) -> Result<()> {
            if depth > MAX_TREE_DEPTH {
                return Err(GraphError::CyclicInput(format!(
                    "category {} is deeper than {} levels",
                    node.id, MAX_TREE_DEPTH
                )));
            }
            visit(node, depth);
            for child in &node.children {
                walk(child, depth + 1, visit)?;
            }
            Ok(())
        }

        for root in &self.roots {
            walk(root, 1, &mut visit)?;
        }
        Ok(())
    }

    /// Check the tree invariants: bounded depth and globally unique ids.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicate: Option<String> = None;
        self.preorder(|node, _| {
            if !seen.insert(node.id.clone()) && duplicate.is_none() {
                duplicate = Some(node.id.clone());
            }
        })?;
        match duplicate {
            Some(id) => Err(GraphError::CyclicInput(format!(
                "category id {} appears more than once",
                id
            ))),
            None => Ok(()),
        }
    }

    pub fn find(&self, id: &str) -> Option<&CategoryNode> {
        self.path_to(id).and_then(|path| path.last().copied())
    }

    /// Chain of nodes from a top-level category down to `id` (inclusive).
    pub fn path_to(&self, id: &str) -> Option<Vec<&CategoryNode>> {
        fn search<'a>(
            node: &'a CategoryNode,
            id: &str,
            path: &mut Vec<&'a CategoryNode>,
        ) -> bool {
            if path.len() >= MAX_TREE_DEPTH {
                return false;
            }
            path.push(node);
            if node.id == id {
                return true;
            }
            for child in &node.children {
                if search(child, id, path) {
                    return true;
                }
            }
            path.pop();
            false
        }

        let mut path = Vec::new();
        for root in &self.roots {
            if search(root, id, &mut path) {
                return Some(path);
            }
        }
        None
    }

    /// Category names from the top level down to `id`, used as a node's filter path.
    pub fn name_path(&self, id: &str) -> Vec<String> {
        self.path_to(id)
            .map(|p| p.iter().map(|n| n.name.clone()).collect())
            .unwrap_or_default()
    }
}
