//! Error types for graph generation, editing, and the mind-map store.
//!
//! Every failure here is local and recoverable: a rejected mutation leaves
//! the graph in its last valid state.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// `add_node` was given a parent id that is not in the graph.
    #[error("parent node not found: {0}")]
    InvalidParent(String),

    #[error("node not found: {0}")]
    UnknownNode(String),

    #[error("edge not found: {0}")]
    UnknownEdge(String),

    /// Source and target of a connection are the same node.
    #[error("cannot connect node {0} to itself")]
    SelfLoop(String),

    /// Category input is not a finite tree (too deep or repeats an id).
    #[error("category input is not a tree: {0}")]
    CyclicInput(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("duplicate edge id: {0}")]
    DuplicateEdge(String),

    /// A second node of kind `Root` was requested.
    #[error("graph already has a root node: {0}")]
    RootExists(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("no node is selected")]
    NothingSelected,

    #[error("editor is not in connecting mode")]
    NotConnecting,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database lock poisoned")]
    Lock,

    #[error("mind map not found: {0}")]
    NotFound(i64),

    #[error("invalid mind map document: {0}")]
    InvalidDocument(String),
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
