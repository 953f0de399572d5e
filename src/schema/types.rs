//! Schema definition types
//!
//! Declarative resource, attribute and relationship definitions. These are the
//! deserialized shapes; `Schema::compile` validates them once and freezes them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::One => write!(f, "one"),
            Cardinality::Many => write!(f, "many"),
        }
    }
}

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl AttributeType {
    /// Check whether a JSON value is acceptable for this attribute type.
    /// Null is accepted for every type.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match (self, value) {
            (_, Value::Null) => true,
            (AttributeType::Any, _) => true,
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (AttributeType::Number, Value::Number(_)) => true,
            (AttributeType::Boolean, Value::Bool(_)) => true,
            (AttributeType::Array, Value::Array(_)) => true,
            (AttributeType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Integer => "integer",
            AttributeType::Number => "number",
            AttributeType::Boolean => "boolean",
            AttributeType::Array => "array",
            AttributeType::Object => "object",
            AttributeType::Any => "any",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An attribute declaration: either a bare type name or `{ "type": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeDecl {
    Bare(AttributeType),
    Detailed {
        #[serde(rename = "type")]
        attribute_type: AttributeType,
    },
}

impl AttributeDecl {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeDecl::Bare(t) => *t,
            AttributeDecl::Detailed { attribute_type } => *attribute_type,
        }
    }
}

/// Relationship declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDef {
    /// Target resource type
    #[serde(rename = "type")]
    pub target_type: String,

    /// Whether the relationship holds one reference or many
    pub cardinality: Cardinality,

    /// Name of the symmetric relationship on the target type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
}

impl RelationshipDef {
    pub fn new(target_type: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            target_type: target_type.into(),
            cardinality,
            inverse: None,
        }
    }

    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}

fn default_id_attribute() -> String {
    "id".to_string()
}

/// Resource type declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDef {
    /// Attribute holding the resource id
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,

    #[serde(default)]
    pub attributes: IndexMap<String, AttributeDecl>,

    #[serde(default)]
    pub relationships: IndexMap<String, RelationshipDef>,
}

impl ResourceDef {
    pub fn attribute_type(&self, name: &str) -> Option<AttributeType> {
        self.attributes.get(name).map(AttributeDecl::attribute_type)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.get(name)
    }

    /// Declared attribute names in declaration order
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// Raw schema document: `{ "resources": { type: ResourceDef } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub resources: IndexMap<String, ResourceDef>,
}
