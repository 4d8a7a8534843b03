//! Study-map diagram engine: turns category trees or tagged content into
//! positioned node/edge graphs and keeps them consistent under editing.

pub mod auto_layout;
pub mod category;
pub mod content;
pub mod db;
pub mod editor;
pub mod error;
pub mod graph;
pub mod layout;
pub mod settings;
pub mod utils;

pub use auto_layout::AutoLayout;
pub use category::{CategoryNode, CategoryTree};
pub use content::{ContentLookup, ContentRef, InMemoryContent, ItemQuery};
pub use editor::{ClickPolicy, EditorOutcome, EditorState, GraphEditorController, PointerEvent};
pub use error::{EditorError, GraphError, StoreError};
pub use graph::{Graph, GraphEdge, GraphModel, GraphNode, NodeKind, Position};
pub use layout::{LayoutGenerator, LayoutKind, LayoutOptions};
pub use settings::Settings;
