//! Resgraph
//!
//! A schema-driven resource graph query and mutation engine.
//!
//! # Architecture
//!
//! - `schema`: resource types, attributes and bidirectional relationships
//! - `graph`: the normalized `type -> id -> resource` data a query runs against
//! - `expression`: JSON-shaped expressions, applied to input or evaluated alone
//! - `query`: normalization, Volcano-style operators, projection with sub-queries
//! - `quiver`: mutation staging that keeps inverse relationships coherent
//! - `store`: the async store contract and an in-memory reference store
//!
//! ## Example Usage
//!
//! ```rust
//! use resgraph::{Graph, QueryEngine, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::from_value(json!({
//!     "resources": {
//!         "bears": {
//!             "attributes": { "id": "string", "name": "string" },
//!             "relationships": {}
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let graph = Graph::from_value(&schema, json!({
//!     "bears": { "1": { "attributes": { "name": "Tenderheart Bear" } } }
//! }))
//! .unwrap();
//!
//! let engine = QueryEngine::new();
//! let result = futures::executor::block_on(
//!     engine.execute(&schema, &graph, &json!({ "type": "bears", "select": ["name"] })),
//! )
//! .unwrap();
//! assert_eq!(result, json!([{ "name": "Tenderheart Bear" }]));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod expression;
pub mod graph;
pub mod query;
pub mod quiver;
pub mod schema;
pub mod store;

#[cfg(test)]
mod test_fixtures;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, EngineConfig};

pub use expression::{
    ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult,
};

pub use graph::{Graph, GraphError, GraphResult, Reference, RelationshipValue, Resource};

pub use query::{
    normalize_query, ExecutionError, ExecutionResult, Query, QueryEngine, Selector, Violation,
};

pub use quiver::{ChangeSet, Quiver, QuiverError, QuiverResult, ResourceQuiver};

pub use schema::{Cardinality, Schema, SchemaError, SchemaResult};

pub use store::{MemoryStore, Store, StoreError, StoreResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
