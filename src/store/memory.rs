//! In-memory store
//!
//! Holds the whole graph behind a tokio `RwLock`. Queries read-lock the graph for
//! their lifetime. A write stages its quiver against the graph it will be applied
//! to, then swaps in a copy with the change set applied, so a failed apply leaves
//! the stored graph untouched.
//!
//! With the write gate, writers queue on the gate and stage under a read lock so
//! queries keep running meanwhile. Without it, staging holds the write lock.

use super::{Store, StoreError, StoreResult};
use crate::config::EngineConfig;
use crate::graph::{id_from_value, Graph, Reference, Resource};
use crate::query::QueryEngine;
use crate::quiver::{ChangeSet, QuiverResult, ResourceQuiver};
use crate::schema::Schema;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub struct MemoryStore {
    schema: Arc<Schema>,
    graph: Arc<RwLock<Graph>>,
    engine: QueryEngine,
    /// Serializes whole mutations when `serialize_writes` is set
    write_gate: Option<Mutex<()>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(schema: Schema) -> Self {
        let graph = Graph::for_schema(&schema);
        Self::with_graph(schema, graph)
    }

    pub fn with_graph(schema: Schema, graph: Graph) -> Self {
        Self::with_config(schema, graph, EngineConfig::default())
    }

    pub fn with_config(schema: Schema, graph: Graph, config: EngineConfig) -> Self {
        let write_gate = config.serialize_writes.then(|| Mutex::new(()));
        Self {
            schema: Arc::new(schema),
            graph: Arc::new(RwLock::new(graph)),
            engine: QueryEngine::with_config(config),
            write_gate,
        }
    }

    /// Load a store from a graph document
    pub fn from_value(schema: Schema, graph: Value) -> StoreResult<Self> {
        let graph = Graph::from_value(&schema, graph)?;
        Ok(Self::with_graph(schema, graph))
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Copy of the current graph
    pub async fn snapshot(&self) -> Graph {
        self.graph.read().await.clone()
    }

    /// Build a quiver with `build`, then apply its change set
    async fn mutate<T, F>(&self, build: F) -> StoreResult<T>
    where
        T: Send,
        F: for<'q> FnOnce(&mut ResourceQuiver<'q>) -> QuiverResult<T> + Send,
    {
        let Some(gate) = &self.write_gate else {
            let mut graph = self.graph.write().await;
            let (changes, output) = stage(&self.schema, &graph, build)?;
            self.commit(&mut graph, &changes)?;
            return Ok(output);
        };

        let _gate = gate.lock().await;
        let (changes, output) = {
            let graph = self.graph.read().await;
            stage(&self.schema, &graph, build)?
        };
        let mut graph = self.graph.write().await;
        self.commit(&mut graph, &changes)?;
        Ok(output)
    }

    fn commit(&self, graph: &mut Graph, changes: &ChangeSet) -> StoreResult<()> {
        if changes.is_empty() {
            debug!("Mutation produced no changes");
            return Ok(());
        }

        let mut next = graph.clone();
        next.apply(&self.schema, changes)?;
        *graph = next;

        info!(
            "Applied mutation: {} upserts, {} deletes, {} arrows added, {} arrows removed",
            changes.upserts.len(),
            changes.deletes.len(),
            changes.arrows_added.len(),
            changes.arrows_removed.len()
        );
        Ok(())
    }

    /// Resolve the id of a resource about to be created
    fn creation_id(&self, resource: &Resource) -> String {
        if !resource.id.is_empty() {
            return resource.id.clone();
        }
        let id_attribute = self
            .schema
            .resource(&resource.resource_type)
            .map(|def| def.id_attribute.as_str())
            .unwrap_or("id");
        resource
            .attributes
            .get(id_attribute)
            .and_then(id_from_value)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    async fn persisted(&self, reference: &Reference) -> StoreResult<Resource> {
        self.graph
            .read()
            .await
            .find_one(reference)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(reference.clone()))
    }
}

fn stage<T, F>(schema: &Schema, graph: &Graph, build: F) -> QuiverResult<(ChangeSet, T)>
where
    F: for<'q> FnOnce(&mut ResourceQuiver<'q>) -> QuiverResult<T>,
{
    let mut quiver = ResourceQuiver::new(schema, graph);
    let output = build(&mut quiver)?;
    Ok((quiver.into_change_set(), output))
}

#[async_trait]
impl Store for MemoryStore {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn query(&self, query: &Value) -> StoreResult<Value> {
        let graph = self.graph.read().await;
        Ok(self.engine.execute(&self.schema, &graph, query).await?)
    }

    async fn create(&self, mut resource: Resource) -> StoreResult<Resource> {
        resource.id = self.creation_id(&resource);
        let reference = resource.reference();

        let created = self
            .mutate(|quiver| {
                if quiver.graph().contains(&reference) {
                    return Ok(false);
                }
                quiver.assert_resource(&resource)?;
                Ok(true)
            })
            .await?;
        if !created {
            return Err(StoreError::AlreadyExists(reference));
        }

        self.persisted(&reference).await
    }

    async fn update(&self, resource: Resource) -> StoreResult<Resource> {
        let reference = resource.reference();

        let found = self
            .mutate(|quiver| {
                if !quiver.graph().contains(&reference) {
                    return Ok(false);
                }
                quiver.assert_resource(&resource)?;
                Ok(true)
            })
            .await?;
        if !found {
            return Err(StoreError::NotFound(reference));
        }

        self.persisted(&reference).await
    }

    async fn delete(&self, reference: &Reference) -> StoreResult<()> {
        let found = self
            .mutate(|quiver| {
                if !quiver.graph().contains(reference) {
                    return Ok(false);
                }
                quiver.retract_resource(reference)?;
                Ok(true)
            })
            .await?;
        if !found {
            return Err(StoreError::NotFound(reference.clone()));
        }
        Ok(())
    }

    async fn merge(&self, query: &Value, tree: &Value) -> StoreResult<Value> {
        let mut query = self.engine.normalize(&self.schema, query)?;
        let resource_type = query.resource_type.clone();

        let roots = self
            .mutate(|quiver| match tree {
                Value::Array(trees) => trees
                    .iter()
                    .map(|tree| quiver.assert_tree(&resource_type, tree))
                    .collect::<QuiverResult<Vec<_>>>(),
                single => Ok(vec![quiver.assert_tree(&resource_type, single)?]),
            })
            .await?;

        let graph = self.graph.read().await;
        let mut merged = Vec::with_capacity(roots.len());
        for root in &roots {
            query.id = Some(root.id.clone());
            merged.push(
                self.engine
                    .execute_normalized(&self.schema, &graph, &query)
                    .await?,
            );
        }

        if tree.is_array() {
            return Ok(Value::Array(merged));
        }
        Ok(merged.pop().unwrap_or(Value::Null))
    }

    async fn find(&self, resource_type: &str) -> StoreResult<Vec<Resource>> {
        Ok(self.graph.read().await.find(resource_type).cloned().collect())
    }

    async fn find_one(&self, reference: &Reference) -> StoreResult<Option<Resource>> {
        Ok(self.graph.read().await.find_one(reference).cloned())
    }
}
