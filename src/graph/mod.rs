mod model;
mod models;

pub use model::{GraphModel, IdSource, NodePatch, SequentialIds, UuidIds, CHILD_OFFSET_X};
pub use models::{edge_id, EdgeOrigin, Graph, GraphEdge, GraphNode, NodeKind, Position, Style, Truncation};
