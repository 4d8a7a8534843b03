mod models;
mod schema;

pub use models::{MindMapContent, MindMapRecord, CONTENT_VERSION};
pub use schema::{Database, StoreResult};
