//! Resource materialization
//!
//! Renders a resource as a JSON object that paths and expressions traverse.
//! Only the relationships a [`ViewShape`] names are replaced by the related
//! resources; every other relationship stays as `{type, id}` references and is
//! never dereferenced.

use super::store::{Graph, GraphResult};
use super::types::{RelationshipValue, Resource};
use crate::schema::Schema;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Relationships to dereference, nested per level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewShape {
    follow: IndexMap<String, ViewShape>,
}

impl ViewShape {
    /// Shape that dereferences nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape covering every relationship the given paths cross.
    ///
    /// A path that ends on a relationship reads its references and does not
    /// dereference it. Unknown segments end the walk.
    pub fn from_paths<'p>(
        schema: &Schema,
        resource_type: &str,
        paths: impl IntoIterator<Item = &'p str>,
    ) -> Self {
        let mut shape = Self::new();
        for path in paths {
            let segments: Vec<&str> = path
                .split('.')
                .filter(|s| !s.is_empty() && *s != "$" && s.parse::<usize>().is_err())
                .collect();
            shape.add(schema, resource_type, &segments);
        }
        shape
    }

    fn add(&mut self, schema: &Schema, resource_type: &str, segments: &[&str]) {
        let Some((head, rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        if let Some(relationship) = schema.relationship(resource_type, head) {
            self.follow
                .entry(head.to_string())
                .or_default()
                .add(schema, &relationship.target_type, rest);
        }
    }

    /// Relationships followed at this level
    pub fn relationships(&self) -> impl Iterator<Item = &str> {
        self.follow.keys().map(String::as_str)
    }

    pub fn is_flat(&self) -> bool {
        self.follow.is_empty()
    }
}

fn references(value: &RelationshipValue) -> Value {
    match value {
        RelationshipValue::One(Some(r)) => r.to_value(),
        RelationshipValue::One(None) => Value::Null,
        RelationshipValue::Many(refs) => Value::Array(refs.iter().map(|r| r.to_value()).collect()),
    }
}

/// Materialize a resource, dereferencing the relationships `shape` names.
pub fn materialize(
    schema: &Schema,
    graph: &Graph,
    resource: &Resource,
    shape: &ViewShape,
) -> GraphResult<Value> {
    let mut view = Map::new();

    let id_attribute = schema
        .resource(&resource.resource_type)
        .map(|def| def.id_attribute.as_str())
        .unwrap_or("id");
    view.insert(id_attribute.to_string(), Value::String(resource.id.clone()));

    for (name, value) in &resource.attributes {
        view.insert(name.clone(), value.clone());
    }

    for (name, value) in &resource.relationships {
        let Some(inner) = shape.follow.get(name) else {
            view.insert(name.clone(), references(value));
            continue;
        };
        let rendered = match value {
            RelationshipValue::One(Some(r)) => {
                let target = graph.dereference(resource, name, r)?;
                materialize(schema, graph, target, inner)?
            }
            RelationshipValue::One(None) => Value::Null,
            RelationshipValue::Many(refs) => {
                let mut items = Vec::with_capacity(refs.len());
                for r in refs {
                    let target = graph.dereference(resource, name, r)?;
                    items.push(materialize(schema, graph, target, inner)?);
                }
                Value::Array(items)
            }
        };
        view.insert(name.clone(), rendered);
    }

    Ok(Value::Object(view))
}
