//! The quiver: per-mutation staging of node and arrow assertions
//!
//! Calls are processed in issuance order and contradictions fail immediately.
//! Nodes and arrows are keyed by reference content, never by identity.

use super::changes::{Arrow, ArrowChanges, ArrowGroup, ChangeSet, NodeUpsert};
use super::error::{PropertyConflict, QuiverError, QuiverResult};
use crate::expression::values_equal;
use crate::graph::Reference;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Asserted,
    Retracted,
    /// Only referenced as an arrow endpoint
    Related,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub properties: Map<String, Value>,
    pub state: NodeState,
}

type ArrowIndex = IndexMap<Reference, IndexMap<String, IndexSet<Reference>>>;

fn arrow_index_contains(index: &ArrowIndex, arrow: &Arrow) -> bool {
    index
        .get(&arrow.source)
        .and_then(|labels| labels.get(&arrow.label))
        .is_some_and(|targets| targets.contains(&arrow.target))
}

fn arrow_index_insert(index: &mut ArrowIndex, arrow: Arrow) {
    index
        .entry(arrow.source)
        .or_default()
        .entry(arrow.label)
        .or_default()
        .insert(arrow.target);
}

/// Staging area for one mutation
#[derive(Debug, Clone, Default)]
pub struct Quiver {
    nodes: IndexMap<Reference, NodeEntry>,
    asserted_arrows: ArrowIndex,
    retracted_arrows: ArrowIndex,
    asserted_arrow_groups: FxHashSet<(Reference, String)>,
}

impl Quiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert a node, merging properties into any earlier assertion
    pub fn assert_node(
        &mut self,
        reference: Reference,
        properties: Map<String, Value>,
    ) -> QuiverResult<()> {
        let Some(entry) = self.nodes.get_mut(&reference) else {
            self.nodes.insert(
                reference,
                NodeEntry {
                    properties,
                    state: NodeState::Asserted,
                },
            );
            return Ok(());
        };

        if entry.state == NodeState::Retracted {
            warn!("Node {} asserted after retraction", reference);
            return Err(QuiverError::AssertRetractedNode(reference));
        }

        let conflicts: Vec<PropertyConflict> = properties
            .iter()
            .filter_map(|(property, incoming)| {
                let existing = entry.properties.get(property)?;
                (!values_equal(existing, incoming)).then(|| PropertyConflict {
                    property: property.clone(),
                    existing: existing.clone(),
                    incoming: incoming.clone(),
                })
            })
            .collect();
        if !conflicts.is_empty() {
            warn!("Conflicting properties asserted for {}", reference);
            return Err(QuiverError::ConflictingProperties {
                reference,
                conflicts,
            });
        }

        entry.properties.extend(properties);
        entry.state = NodeState::Asserted;
        Ok(())
    }

    /// Mark a node deleted. Retracting twice is a no-op.
    pub fn retract_node(&mut self, reference: Reference) -> QuiverResult<()> {
        match self.nodes.get(&reference).map(|entry| entry.state) {
            Some(NodeState::Asserted) => {
                warn!("Node {} retracted after assertion", reference);
                return Err(QuiverError::RetractAssertedNode(reference));
            }
            Some(NodeState::Related) if self.has_asserted_arrows_touching(&reference) => {
                warn!("Node {} retracted while asserted arrows reference it", reference);
                return Err(QuiverError::RetractLinkedNode(reference));
            }
            _ => {}
        }

        self.nodes.insert(
            reference,
            NodeEntry {
                properties: Map::new(),
                state: NodeState::Retracted,
            },
        );
        Ok(())
    }

    /// Assert an arrow, implicitly relating both endpoints
    pub fn assert_arrow(
        &mut self,
        source: Reference,
        label: impl Into<String>,
        target: Reference,
    ) -> QuiverResult<()> {
        let arrow = Arrow::new(source, label, target);

        if arrow_index_contains(&self.retracted_arrows, &arrow) {
            warn!("Arrow {} asserted after retraction", arrow);
            return Err(QuiverError::AssertRetractedArrow(arrow));
        }
        let retracted = [&arrow.source, &arrow.target]
            .into_iter()
            .find(|endpoint| self.is_retracted(endpoint))
            .cloned();
        if let Some(node) = retracted {
            warn!("Arrow {} touches retracted node {}", arrow, node);
            return Err(QuiverError::ArrowToRetractedNode { arrow, node });
        }
        if self.is_group_complete(&arrow.source, &arrow.label)
            && !arrow_index_contains(&self.asserted_arrows, &arrow)
        {
            warn!("Arrow {} falls outside a complete group", arrow);
            return Err(QuiverError::ArrowOutsideGroup(arrow));
        }

        self.relate(&arrow.source);
        self.relate(&arrow.target);
        arrow_index_insert(&mut self.asserted_arrows, arrow);
        Ok(())
    }

    pub fn retract_arrow(
        &mut self,
        source: Reference,
        label: impl Into<String>,
        target: Reference,
    ) -> QuiverResult<()> {
        let arrow = Arrow::new(source, label, target);
        if arrow_index_contains(&self.asserted_arrows, &arrow) {
            warn!("Arrow {} retracted after assertion", arrow);
            return Err(QuiverError::RetractAssertedArrow(arrow));
        }
        arrow_index_insert(&mut self.retracted_arrows, arrow);
        Ok(())
    }

    /// Declare the complete target set of a to-many relationship.
    ///
    /// A repeated declaration must name the same set, and arrows asserted
    /// individually beforehand must belong to it.
    pub fn assert_arrow_group(
        &mut self,
        source: Reference,
        label: impl Into<String>,
        targets: impl IntoIterator<Item = Reference>,
    ) -> QuiverResult<()> {
        let label = label.into();
        let targets: IndexSet<Reference> = targets.into_iter().collect();
        let current = self
            .asserted_targets(&source, &label)
            .cloned()
            .unwrap_or_default();

        if self.is_group_complete(&source, &label) {
            if current != targets {
                warn!("Complete group {}.{} redeclared with different targets", source, label);
                return Err(QuiverError::ConflictingArrowGroup {
                    source_ref: source,
                    label,
                });
            }
            return Ok(());
        }

        if let Some(outside) = current.iter().find(|t| !targets.contains(*t)) {
            let arrow = Arrow::new(source.clone(), label.clone(), outside.clone());
            warn!("Arrow {} falls outside the declared complete group", arrow);
            return Err(QuiverError::ArrowOutsideGroup(arrow));
        }

        for target in &targets {
            self.assert_arrow(source.clone(), label.clone(), target.clone())?;
        }
        // source is related even when the group is empty
        self.relate(&source);
        self.asserted_arrow_groups.insert((source, label));
        Ok(())
    }

    pub fn node(&self, reference: &Reference) -> Option<&NodeEntry> {
        self.nodes.get(reference)
    }

    pub fn is_retracted(&self, reference: &Reference) -> bool {
        self.nodes
            .get(reference)
            .is_some_and(|entry| entry.state == NodeState::Retracted)
    }

    pub fn is_group_complete(&self, source: &Reference, label: &str) -> bool {
        self.asserted_arrow_groups
            .contains(&(source.clone(), label.to_string()))
    }

    pub fn asserted_targets(&self, source: &Reference, label: &str) -> Option<&IndexSet<Reference>> {
        self.asserted_arrows.get(source)?.get(label)
    }

    pub fn retracted_targets(&self, source: &Reference, label: &str) -> Option<&IndexSet<Reference>> {
        self.retracted_arrows.get(source)?.get(label)
    }

    pub fn is_arrow_retracted(&self, source: &Reference, label: &str, target: &Reference) -> bool {
        self.retracted_targets(source, label)
            .is_some_and(|targets| targets.contains(target))
    }

    /// Per-label changes for arrows leaving `source`
    pub fn get_arrow_changes(&self, source: &Reference) -> IndexMap<String, ArrowChanges> {
        let mut changes: IndexMap<String, ArrowChanges> = IndexMap::new();

        if let Some(labels) = self.asserted_arrows.get(source) {
            for (label, targets) in labels {
                let entry = changes.entry(label.clone()).or_default();
                if self.is_group_complete(source, label) {
                    entry.present.extend(targets.iter().cloned());
                } else {
                    entry.asserted.extend(targets.iter().cloned());
                }
            }
        }
        if let Some(labels) = self.retracted_arrows.get(source) {
            for (label, targets) in labels {
                changes
                    .entry(label.clone())
                    .or_default()
                    .retracted
                    .extend(targets.iter().cloned());
            }
        }
        changes
    }

    /// Every node the mutation touches; retracted nodes map to `None`
    pub fn get_nodes(&self) -> IndexMap<Reference, Option<Map<String, Value>>> {
        self.nodes
            .iter()
            .map(|(reference, entry)| {
                let properties = match entry.state {
                    NodeState::Retracted => None,
                    NodeState::Asserted | NodeState::Related => Some(entry.properties.clone()),
                };
                (reference.clone(), properties)
            })
            .collect()
    }

    /// Drain into the flat change set a store applies
    pub fn into_change_set(self) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (reference, entry) in self.nodes {
            match entry.state {
                NodeState::Retracted => changes.deletes.push(reference),
                NodeState::Asserted | NodeState::Related => changes.upserts.push(NodeUpsert {
                    reference,
                    properties: entry.properties,
                }),
            }
        }

        for (source, labels) in self.asserted_arrows {
            for (label, targets) in labels {
                let key = (source.clone(), label);
                if self.asserted_arrow_groups.contains(&key) {
                    let (source, label) = key;
                    changes.complete_groups.push(ArrowGroup {
                        source,
                        label,
                        targets: targets.into_iter().collect(),
                    });
                } else {
                    let (source, label) = key;
                    changes.arrows_added.extend(
                        targets
                            .into_iter()
                            .map(|target| Arrow::new(source.clone(), label.clone(), target)),
                    );
                }
            }
        }

        // empty complete groups never made it into the arrow index
        for (source, label) in self.asserted_arrow_groups {
            let recorded = changes
                .complete_groups
                .iter()
                .any(|g| g.source == source && g.label == label);
            if !recorded {
                changes.complete_groups.push(ArrowGroup {
                    source,
                    label,
                    targets: Vec::new(),
                });
            }
        }

        for (source, labels) in self.retracted_arrows {
            for (label, targets) in labels {
                changes.arrows_removed.extend(
                    targets
                        .into_iter()
                        .map(|target| Arrow::new(source.clone(), label.clone(), target)),
                );
            }
        }

        changes
    }

    fn relate(&mut self, reference: &Reference) {
        self.nodes
            .entry(reference.clone())
            .or_insert_with(|| NodeEntry {
                properties: Map::new(),
                state: NodeState::Related,
            });
    }

    fn has_asserted_arrows_touching(&self, reference: &Reference) -> bool {
        self.asserted_arrows.iter().any(|(source, labels)| {
            labels.values().any(|targets| {
                !targets.is_empty() && (source == reference || targets.contains(reference))
            })
        })
    }
}
