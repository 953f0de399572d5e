//! Quiver error types

use super::changes::Arrow;
use crate::graph::Reference;
use crate::schema::{AttributeType, Cardinality};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub type QuiverResult<T> = Result<T, QuiverError>;

/// A property asserted twice with different values
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyConflict {
    pub property: String,
    pub existing: Value,
    pub incoming: Value,
}

impl fmt::Display for PropertyConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} vs {})", self.property, self.existing, self.incoming)
    }
}

fn list_conflicts(conflicts: &[PropertyConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Consistency failures raised while a quiver is being built.
///
/// Any of these aborts the whole mutation; nothing reaches the store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuiverError {
    #[error("Cannot assert {0}: it was retracted in this mutation")]
    AssertRetractedNode(Reference),

    #[error("Cannot retract {0}: it was asserted in this mutation")]
    RetractAssertedNode(Reference),

    #[error("Cannot retract {0}: arrows asserted in this mutation still reference it")]
    RetractLinkedNode(Reference),

    #[error("Conflicting values for {reference}: {}", list_conflicts(.conflicts))]
    ConflictingProperties {
        reference: Reference,
        conflicts: Vec<PropertyConflict>,
    },

    #[error("Cannot assert arrow {0}: it was retracted in this mutation")]
    AssertRetractedArrow(Arrow),

    #[error("Cannot retract arrow {0}: it was asserted in this mutation")]
    RetractAssertedArrow(Arrow),

    #[error("Arrow {arrow} touches {node}, which was retracted in this mutation")]
    ArrowToRetractedNode { arrow: Arrow, node: Reference },

    #[error("The complete set of {source_ref}.{label} was already declared with different targets")]
    ConflictingArrowGroup { source_ref: Reference, label: String },

    #[error("Arrow {0} is outside the complete set already declared for its relationship")]
    ArrowOutsideGroup(Arrow),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Unknown attribute {attribute} on type {resource_type}")]
    UnknownAttribute {
        resource_type: String,
        attribute: String,
    },

    #[error("Unknown relationship {relationship} on type {resource_type}")]
    UnknownRelationship {
        resource_type: String,
        relationship: String,
    },

    #[error("Attribute {attribute} of {reference} must be {expected}")]
    AttributeType {
        reference: Reference,
        attribute: String,
        expected: AttributeType,
    },

    #[error("Relationship {relationship} on {reference} must hold {expected} reference(s)")]
    CardinalityMismatch {
        reference: Reference,
        relationship: String,
        expected: Cardinality,
    },

    #[error("Resource of type {0} is missing its id")]
    MissingId(String),

    #[error("Invalid resource tree: {0}")]
    InvalidTree(String),
}
