//! Core type definitions for the resource graph

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Pointer to a resource: `{ type, id }`. Never carries attributes.
///
/// References compare and hash by content, so they can key maps directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl Reference {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Reference {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// JSON rendering `{ "type": ..., "id": ... }`
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.resource_type.clone()));
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.id)
    }
}

impl<T: Into<String>, I: Into<String>> From<(T, I)> for Reference {
    fn from((resource_type, id): (T, I)) -> Self {
        Reference::new(resource_type, id)
    }
}

/// Extract a resource id from a JSON value. Strings and numbers are accepted.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The value of one relationship on a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipValue {
    Many(Vec<Reference>),
    One(Option<Reference>),
}

impl RelationshipValue {
    /// Every reference held, regardless of cardinality
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            RelationshipValue::Many(refs) => refs.iter().collect(),
            RelationshipValue::One(Some(r)) => vec![r],
            RelationshipValue::One(None) => Vec::new(),
        }
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        match self {
            RelationshipValue::Many(refs) => refs.contains(reference),
            RelationshipValue::One(r) => r.as_ref() == Some(reference),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, RelationshipValue::Many(_))
    }
}

/// A typed, identified record with attributes and relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,

    pub id: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default)]
    pub relationships: IndexMap<String, RelationshipValue>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Resource {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: Map::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_one(mut self, name: impl Into<String>, target: Option<Reference>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::One(target));
        self
    }

    pub fn with_many(mut self, name: impl Into<String>, targets: Vec<Reference>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::Many(targets));
        self
    }

    pub fn reference(&self) -> Reference {
        Reference::new(self.resource_type.clone(), self.id.clone())
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipValue> {
        self.relationships.get(name)
    }

    /// Look up an attribute, treating the id attribute as always present.
    ///
    /// A stored id attribute keeps its own value; otherwise the id is a string.
    pub fn attribute(&self, id_attribute: &str, name: &str) -> Value {
        match self.attributes.get(name) {
            Some(value) => value.clone(),
            None if name == id_attribute => Value::String(self.id.clone()),
            None => Value::Null,
        }
    }
}
