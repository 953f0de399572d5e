//! Store contract
//!
//! A store owns resource data and exposes it to the query engine. Writes go
//! through a [`ResourceQuiver`](crate::quiver::ResourceQuiver) so inverse
//! relationships stay coherent; a failed quiver aborts the write before
//! anything is persisted.

pub mod memory;

pub use memory::MemoryStore;

use crate::expression::ExpressionError;
use crate::graph::{GraphError, Reference, Resource};
use crate::query::ExecutionError;
use crate::quiver::QuiverError;
use crate::schema::{Schema, SchemaError};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Query error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Mutation rejected: {0}")]
    Quiver(#[from] QuiverError),

    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Resource not found: {0}")]
    NotFound(Reference),

    #[error("Resource already exists: {0}")]
    AlreadyExists(Reference),

    /// Failures of the backing medium, passed through unmodified
    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations every backing store provides
#[async_trait]
pub trait Store: Send + Sync {
    /// Schema the store's data conforms to
    fn schema(&self) -> &Schema;

    /// Run a query: a single resource (or null) when it names an id, else a list
    async fn query(&self, query: &Value) -> StoreResult<Value>;

    /// Persist a new resource
    async fn create(&self, resource: Resource) -> StoreResult<Resource>;

    /// Update attributes and the relationships the resource carries
    async fn update(&self, resource: Resource) -> StoreResult<Resource>;

    async fn delete(&self, reference: &Reference) -> StoreResult<()>;

    /// Apply a denormalized tree (or array of trees) of the query's type, then
    /// return the query's view of the merged roots
    async fn merge(&self, query: &Value, tree: &Value) -> StoreResult<Value>;

    async fn find(&self, resource_type: &str) -> StoreResult<Vec<Resource>>;

    async fn find_one(&self, reference: &Reference) -> StoreResult<Option<Resource>>;
}
