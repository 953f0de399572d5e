//! Change-set types a drained quiver hands to a store

use crate::graph::Reference;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Labeled, directed edge between two resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arrow {
    pub source: Reference,
    pub label: String,
    pub target: Reference,
}

impl Arrow {
    pub fn new(source: Reference, label: impl Into<String>, target: Reference) -> Self {
        Self {
            source,
            label: label.into(),
            target,
        }
    }
}

impl fmt::Display for Arrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.source, self.label, self.target)
    }
}

/// Resource to create or merge properties into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpsert {
    pub reference: Reference,
    pub properties: Map<String, Value>,
}

/// Full replacement of a to-many relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowGroup {
    pub source: Reference,
    pub label: String,
    pub targets: Vec<Reference>,
}

/// Net effect of one mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub upserts: Vec<NodeUpsert>,
    pub deletes: Vec<Reference>,
    pub arrows_added: Vec<Arrow>,
    pub arrows_removed: Vec<Arrow>,
    pub complete_groups: Vec<ArrowGroup>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty()
            && self.deletes.is_empty()
            && self.arrows_added.is_empty()
            && self.arrows_removed.is_empty()
            && self.complete_groups.is_empty()
    }
}

/// Per-label arrow changes for one source node.
///
/// `present` holds members of a complete group, which need no incremental add.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrowChanges {
    pub asserted: IndexSet<Reference>,
    pub present: IndexSet<Reference>,
    pub retracted: IndexSet<Reference>,
}
