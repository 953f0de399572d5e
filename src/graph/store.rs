//! In-memory resource graph
//!
//! The read-side view a query executes against: `type -> id -> Resource`. It is owned by
//! a store and lent read-only to the query engine for the lifetime of one query. Writes
//! arrive only as a drained quiver `ChangeSet` through `Graph::apply`.

use super::types::{id_from_value, Reference, RelationshipValue, Resource};
use crate::quiver::ChangeSet;
use crate::schema::{Cardinality, Schema};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Unknown relationship {relationship} on type {resource_type}")]
    UnknownRelationship {
        resource_type: String,
        relationship: String,
    },

    #[error("Relationship {relationship} on {reference} must hold {expected} reference(s)")]
    CardinalityMismatch {
        reference: Reference,
        relationship: String,
        expected: Cardinality,
    },

    #[error("Dangling reference: {source_ref}.{relationship} points at missing {target}")]
    DanglingReference {
        source_ref: Reference,
        relationship: String,
        target: Reference,
    },

    #[error("Invalid graph document: {0}")]
    InvalidDocument(String),

    #[error("Graph JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Default, Deserialize)]
struct RawResource {
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    relationships: IndexMap<String, RelationshipValue>,
}

/// Normalized resource graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    resources: IndexMap<String, IndexMap<String, Resource>>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with a bucket for every schema type
    pub fn for_schema(schema: &Schema) -> Self {
        let resources = schema
            .resource_types()
            .map(|t| (t.to_string(), IndexMap::new()))
            .collect();
        Self { resources }
    }

    /// Load a graph document shaped `{ type: { id: { attributes, relationships } } }`.
    ///
    /// Missing relationships are filled with empty values and relationship arity is
    /// checked against schema cardinality.
    pub fn from_value(schema: &Schema, value: Value) -> GraphResult<Self> {
        let Value::Object(types) = value else {
            return Err(GraphError::InvalidDocument(
                "graph must be an object keyed by resource type".to_string(),
            ));
        };

        let mut graph = Graph::for_schema(schema);
        for (resource_type, resources) in types {
            if !schema.has_resource(&resource_type) {
                return Err(GraphError::UnknownResourceType(resource_type));
            }
            let Value::Object(resources) = resources else {
                return Err(GraphError::InvalidDocument(format!(
                    "resources of type {} must be an object keyed by id",
                    resource_type
                )));
            };
            for (id, raw) in resources {
                let raw: RawResource = serde_json::from_value(raw)?;
                let resource = Resource {
                    resource_type: resource_type.clone(),
                    id,
                    attributes: raw.attributes,
                    relationships: raw.relationships,
                };
                graph.insert(normalize_resource(schema, resource)?);
            }
        }

        info!("Loaded graph with {} resources", graph.len());
        Ok(graph)
    }

    /// All resources of a type, in insertion order
    pub fn find(&self, resource_type: &str) -> impl Iterator<Item = &Resource> {
        self.resources
            .get(resource_type)
            .into_iter()
            .flat_map(|by_id| by_id.values())
    }

    /// One resource by reference
    pub fn find_one(&self, reference: &Reference) -> Option<&Resource> {
        self.resources
            .get(&reference.resource_type)?
            .get(&reference.id)
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.find_one(reference).is_some()
    }

    /// Insert or replace a resource
    pub fn insert(&mut self, resource: Resource) {
        self.resources
            .entry(resource.resource_type.clone())
            .or_default()
            .insert(resource.id.clone(), resource);
    }

    /// Remove a resource, returning it if present
    pub fn remove(&mut self, reference: &Reference) -> Option<Resource> {
        self.resources
            .get_mut(&reference.resource_type)?
            .shift_remove(&reference.id)
    }

    /// Total number of resources
    pub fn len(&self) -> usize {
        self.resources.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a relationship target, failing when it is absent from the graph
    pub fn dereference(
        &self,
        source: &Resource,
        relationship: &str,
        target: &Reference,
    ) -> GraphResult<&Resource> {
        self.find_one(target)
            .ok_or_else(|| GraphError::DanglingReference {
                source_ref: source.reference(),
                relationship: relationship.to_string(),
                target: target.clone(),
            })
    }

    /// Apply a drained quiver.
    ///
    /// Order: upserts, arrow retractions, arrow assertions, complete-group
    /// replacements, deletions.
    pub fn apply(&mut self, schema: &Schema, changes: &ChangeSet) -> GraphResult<()> {
        for upsert in &changes.upserts {
            let reference = &upsert.reference;
            let id_attribute = schema
                .resource(&reference.resource_type)
                .map(|def| def.id_attribute.as_str())
                .unwrap_or("id");
            if let Some(existing) = self.get_mut(reference) {
                for (name, value) in &upsert.properties {
                    if name != id_attribute {
                        existing.attributes.insert(name.clone(), value.clone());
                    }
                }
                continue;
            }

            let mut resource = Resource::new(&reference.resource_type, &reference.id);
            resource.attributes = upsert.properties.clone();
            self.insert(normalize_resource(schema, resource)?);
        }

        for arrow in &changes.arrows_removed {
            let cardinality = cardinality_of(schema, &arrow.source, &arrow.label)?;
            let Some(source) = self.get_mut(&arrow.source) else {
                continue;
            };
            let slot = source
                .relationships
                .entry(arrow.label.clone())
                .or_insert_with(|| empty_relationship(cardinality));
            match slot {
                RelationshipValue::One(current) => {
                    if current.as_ref() == Some(&arrow.target) {
                        *current = None;
                    }
                }
                RelationshipValue::Many(targets) => targets.retain(|t| t != &arrow.target),
            }
        }

        for arrow in &changes.arrows_added {
            let cardinality = cardinality_of(schema, &arrow.source, &arrow.label)?;
            let Some(source) = self.get_mut(&arrow.source) else {
                continue;
            };
            let slot = source
                .relationships
                .entry(arrow.label.clone())
                .or_insert_with(|| empty_relationship(cardinality));
            match slot {
                RelationshipValue::One(current) => *current = Some(arrow.target.clone()),
                RelationshipValue::Many(targets) => {
                    if !targets.contains(&arrow.target) {
                        targets.push(arrow.target.clone());
                    }
                }
            }
        }

        for group in &changes.complete_groups {
            if let Some(source) = self.get_mut(&group.source) {
                source.relationships.insert(
                    group.label.clone(),
                    RelationshipValue::Many(group.targets.clone()),
                );
            }
        }

        for reference in &changes.deletes {
            self.remove(reference);
        }

        debug!(
            "Applied change set: {} upserts, {} deletes, +{}/-{} arrows",
            changes.upserts.len(),
            changes.deletes.len(),
            changes.arrows_added.len(),
            changes.arrows_removed.len()
        );
        Ok(())
    }

    fn get_mut(&mut self, reference: &Reference) -> Option<&mut Resource> {
        self.resources
            .get_mut(&reference.resource_type)?
            .get_mut(&reference.id)
    }
}

fn cardinality_of(schema: &Schema, source: &Reference, label: &str) -> GraphResult<Cardinality> {
    schema
        .relationship(&source.resource_type, label)
        .map(|r| r.cardinality)
        .ok_or_else(|| GraphError::UnknownRelationship {
            resource_type: source.resource_type.clone(),
            relationship: label.to_string(),
        })
}

fn empty_relationship(cardinality: Cardinality) -> RelationshipValue {
    match cardinality {
        Cardinality::One => RelationshipValue::One(None),
        Cardinality::Many => RelationshipValue::Many(Vec::new()),
    }
}

/// Fill undeclared relationships, check arity, and fold the id attribute into `id`.
pub(crate) fn normalize_resource(schema: &Schema, mut resource: Resource) -> GraphResult<Resource> {
    let def = schema
        .resource(&resource.resource_type)
        .ok_or_else(|| GraphError::UnknownResourceType(resource.resource_type.clone()))?;

    if let Some(id) = resource.attributes.remove(&def.id_attribute) {
        if let Some(id) = id_from_value(&id) {
            resource.id = id;
        }
    }

    for name in resource.relationships.keys() {
        if def.relationship(name).is_none() {
            return Err(GraphError::UnknownRelationship {
                resource_type: resource.resource_type.clone(),
                relationship: name.clone(),
            });
        }
    }

    for (name, rel) in &def.relationships {
        match resource.relationships.get(name) {
            None => {
                resource
                    .relationships
                    .insert(name.clone(), empty_relationship(rel.cardinality));
            }
            Some(value) if value.is_many() != rel.is_many() => {
                return Err(GraphError::CardinalityMismatch {
                    reference: resource.reference(),
                    relationship: name.clone(),
                    expected: rel.cardinality,
                });
            }
            Some(_) => {}
        }
    }

    Ok(resource)
}
