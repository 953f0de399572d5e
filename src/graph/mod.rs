//! Resource graph data model
//!
//! - References: `{type, id}` pointers compared by content
//! - Resources: typed records with attributes and relationships
//! - Graph: the `type -> id -> resource` view a query runs against

pub mod materialize;
pub mod store;
pub mod types;

// Re-export main types
pub use materialize::{materialize, ViewShape};
pub use store::{Graph, GraphError, GraphResult};
pub use types::{id_from_value, Reference, RelationshipValue, Resource};
