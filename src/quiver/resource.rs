//! Schema-aware quiver
//!
//! Wraps a [`Quiver`] with the schema and the current graph so that every change
//! to a relationship is mirrored on its declared inverse. Previous targets are
//! diffed against new ones: removed members retract the inverse arrow, added
//! members assert it, and a to-one inverse that already points elsewhere is
//! detached from its old holder first.

use super::changes::ChangeSet;
use super::error::{QuiverError, QuiverResult};
use super::staging::Quiver;
use crate::graph::{id_from_value, Graph, Reference, RelationshipValue, Resource};
use crate::schema::{Cardinality, RelationshipDef, ResourceDef, Schema};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use tracing::debug;

pub struct ResourceQuiver<'a> {
    schema: &'a Schema,
    graph: &'a Graph,
    quiver: Quiver,
}

impl<'a> ResourceQuiver<'a> {
    pub fn new(schema: &'a Schema, graph: &'a Graph) -> Self {
        Self {
            schema,
            graph,
            quiver: Quiver::new(),
        }
    }

    /// Graph the quiver diffs against
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub fn quiver(&self) -> &Quiver {
        &self.quiver
    }

    pub fn into_quiver(self) -> Quiver {
        self.quiver
    }

    pub fn into_change_set(self) -> ChangeSet {
        self.quiver.into_change_set()
    }

    /// Assert a normalized resource: its attributes and every relationship it carries.
    ///
    /// A to-many relationship replaces the whole target set.
    pub fn assert_resource(&mut self, resource: &Resource) -> QuiverResult<()> {
        let def = self.resource_def(&resource.resource_type)?;
        let reference = resource.reference();

        let mut properties = Map::new();
        for (name, value) in &resource.attributes {
            if *name == def.id_attribute {
                continue;
            }
            check_attribute(def, &reference, name, value)?;
            properties.insert(name.clone(), value.clone());
        }
        self.quiver.assert_node(reference.clone(), properties)?;

        for (name, value) in &resource.relationships {
            let rel = relationship_def(def, &reference, name)?;
            match value {
                RelationshipValue::One(target) if !rel.is_many() => {
                    self.set_one(&reference, name, target.clone())?;
                }
                RelationshipValue::Many(targets) if rel.is_many() => {
                    self.set_many(&reference, name, targets)?;
                }
                _ => return Err(cardinality_mismatch(&reference, name, rel)),
            }
        }

        debug!("Asserted resource {}", reference);
        Ok(())
    }

    /// Retract a resource along with every arrow into and out of it
    pub fn retract_resource(&mut self, reference: &Reference) -> QuiverResult<()> {
        let def = self.resource_def(&reference.resource_type)?;
        for name in def.relationships.keys() {
            for target in self.effective_targets(reference, name) {
                self.quiver
                    .retract_arrow(reference.clone(), name.as_str(), target.clone())?;
                self.retract_inverse(reference, name, &target)?;
            }
        }
        self.quiver.retract_node(reference.clone())?;
        debug!("Retracted resource {}", reference);
        Ok(())
    }

    /// Add one target to a relationship. On a to-one relationship this replaces
    /// the current target.
    pub fn assert_relationship(
        &mut self,
        source: &Reference,
        name: &str,
        target: &Reference,
    ) -> QuiverResult<()> {
        let def = self.resource_def(&source.resource_type)?;
        let rel = relationship_def(def, source, name)?;
        if !rel.is_many() {
            return self.set_one(source, name, Some(target.clone()));
        }

        if self.effective_targets(source, name).contains(target) {
            return Ok(());
        }
        self.quiver
            .assert_arrow(source.clone(), name, target.clone())?;
        self.assert_inverse(source, name, target)
    }

    pub fn retract_relationship(
        &mut self,
        source: &Reference,
        name: &str,
        target: &Reference,
    ) -> QuiverResult<()> {
        let def = self.resource_def(&source.resource_type)?;
        relationship_def(def, source, name)?;
        self.quiver
            .retract_arrow(source.clone(), name, target.clone())?;
        self.retract_inverse(source, name, target)
    }

    /// Assert a denormalized tree rooted at a resource of `resource_type`.
    ///
    /// Relationship values may be nested trees, bare ids or null. Nested
    /// to-many arrays are complete groups. Returns the root's reference.
    pub fn assert_tree(&mut self, resource_type: &str, tree: &Value) -> QuiverResult<Reference> {
        let def = self.resource_def(resource_type)?;
        let Value::Object(fields) = tree else {
            return Err(QuiverError::InvalidTree(format!(
                "a {} resource must be an object",
                resource_type
            )));
        };
        let id = fields
            .get(&def.id_attribute)
            .and_then(id_from_value)
            .ok_or_else(|| QuiverError::MissingId(resource_type.to_string()))?;
        let reference = Reference::new(resource_type, id);

        let mut properties = Map::new();
        let mut relationships = Vec::new();
        for (name, value) in fields {
            if *name == def.id_attribute {
                continue;
            }
            if let Some(rel) = def.relationship(name) {
                relationships.push((name, rel, value));
                continue;
            }
            check_attribute(def, &reference, name, value)?;
            properties.insert(name.clone(), value.clone());
        }
        self.quiver.assert_node(reference.clone(), properties)?;

        for (name, rel, value) in relationships {
            match (rel.cardinality, value) {
                (Cardinality::One, Value::Null) => self.set_one(&reference, name, None)?,
                (Cardinality::One, Value::Array(_)) | (Cardinality::Many, Value::Null) => {
                    return Err(cardinality_mismatch(&reference, name, rel));
                }
                (Cardinality::One, subtree) => {
                    let target = self.assert_subtree(&rel.target_type, subtree)?;
                    self.set_one(&reference, name, Some(target))?;
                }
                (Cardinality::Many, Value::Array(subtrees)) => {
                    let mut targets = Vec::with_capacity(subtrees.len());
                    for subtree in subtrees {
                        targets.push(self.assert_subtree(&rel.target_type, subtree)?);
                    }
                    self.set_many(&reference, name, &targets)?;
                }
                (Cardinality::Many, _) => {
                    return Err(cardinality_mismatch(&reference, name, rel));
                }
            }
        }

        Ok(reference)
    }

    fn assert_subtree(&mut self, resource_type: &str, value: &Value) -> QuiverResult<Reference> {
        match value {
            Value::Object(_) => self.assert_tree(resource_type, value),
            other => id_from_value(other)
                .map(|id| Reference::new(resource_type, id))
                .ok_or_else(|| {
                    QuiverError::InvalidTree(format!(
                        "expected a {} resource or id, got {}",
                        resource_type, other
                    ))
                }),
        }
    }

    fn set_one(
        &mut self,
        source: &Reference,
        name: &str,
        target: Option<Reference>,
    ) -> QuiverResult<()> {
        let previous = self.effective_targets(source, name).into_iter().next();
        if previous == target {
            return Ok(());
        }

        if let Some(old) = previous {
            self.quiver
                .retract_arrow(source.clone(), name, old.clone())?;
            self.retract_inverse(source, name, &old)?;
        }
        if let Some(new) = target {
            self.quiver
                .assert_arrow(source.clone(), name, new.clone())?;
            self.assert_inverse(source, name, &new)?;
        }
        Ok(())
    }

    fn set_many(&mut self, source: &Reference, name: &str, targets: &[Reference]) -> QuiverResult<()> {
        let previous = self.effective_targets(source, name);
        let next: IndexSet<Reference> = targets.iter().cloned().collect();

        for old in previous.difference(&next) {
            self.quiver
                .retract_arrow(source.clone(), name, old.clone())?;
            self.retract_inverse(source, name, old)?;
        }
        self.quiver
            .assert_arrow_group(source.clone(), name, next.iter().cloned())?;
        for new in next.difference(&previous) {
            self.assert_inverse(source, name, new)?;
        }
        Ok(())
    }

    /// Mirror `source -name-> target` on the target's inverse relationship
    fn assert_inverse(&mut self, source: &Reference, name: &str, target: &Reference) -> QuiverResult<()> {
        let Some((_, inverse_name, inverse)) = self.schema.inverse(&source.resource_type, name) else {
            return Ok(());
        };
        let inverse_name = inverse_name.to_string();

        if !inverse.is_many() {
            let holder = self.effective_targets(target, &inverse_name).into_iter().next();
            if let Some(old) = holder.filter(|old| old != source) {
                // detach the old holder from the target
                self.quiver
                    .retract_arrow(target.clone(), inverse_name.as_str(), old.clone())?;
                self.quiver
                    .retract_arrow(old, name, target.clone())?;
            }
        }

        if self.effective_targets(target, &inverse_name).contains(source) {
            return Ok(());
        }
        self.quiver
            .assert_arrow(target.clone(), inverse_name, source.clone())
    }

    fn retract_inverse(&mut self, source: &Reference, name: &str, target: &Reference) -> QuiverResult<()> {
        let Some((_, inverse_name, _)) = self.schema.inverse(&source.resource_type, name) else {
            return Ok(());
        };
        self.quiver
            .retract_arrow(target.clone(), inverse_name, source.clone())
    }

    /// Targets of a relationship as this mutation currently sees them
    fn effective_targets(&self, source: &Reference, name: &str) -> IndexSet<Reference> {
        let asserted = self.quiver.asserted_targets(source, name);
        if self.quiver.is_group_complete(source, name) {
            return asserted.cloned().unwrap_or_default();
        }

        let is_many = self
            .schema
            .relationship(&source.resource_type, name)
            .is_some_and(RelationshipDef::is_many);
        if !is_many {
            if let Some(last) = asserted.and_then(|targets| targets.last()) {
                return IndexSet::from([last.clone()]);
            }
        }

        let mut targets: IndexSet<Reference> = self
            .graph
            .find_one(source)
            .and_then(|resource| resource.relationship(name))
            .map(|value| value.references().into_iter().cloned().collect())
            .unwrap_or_default();
        targets.retain(|target| !self.quiver.is_arrow_retracted(source, name, target));
        if let Some(asserted) = asserted {
            targets.extend(asserted.iter().cloned());
        }
        targets
    }

    fn resource_def(&self, resource_type: &str) -> QuiverResult<&'a ResourceDef> {
        self.schema
            .resource(resource_type)
            .ok_or_else(|| QuiverError::UnknownResourceType(resource_type.to_string()))
    }
}

fn relationship_def<'d>(
    def: &'d ResourceDef,
    reference: &Reference,
    name: &str,
) -> QuiverResult<&'d RelationshipDef> {
    def.relationship(name)
        .ok_or_else(|| QuiverError::UnknownRelationship {
            resource_type: reference.resource_type.clone(),
            relationship: name.to_string(),
        })
}

fn check_attribute(
    def: &ResourceDef,
    reference: &Reference,
    name: &str,
    value: &Value,
) -> QuiverResult<()> {
    let attribute_type = def
        .attribute_type(name)
        .ok_or_else(|| QuiverError::UnknownAttribute {
            resource_type: reference.resource_type.clone(),
            attribute: name.to_string(),
        })?;
    if !attribute_type.accepts(value) {
        return Err(QuiverError::AttributeType {
            reference: reference.clone(),
            attribute: name.to_string(),
            expected: attribute_type,
        });
    }
    Ok(())
}

fn cardinality_mismatch(reference: &Reference, name: &str, rel: &RelationshipDef) -> QuiverError {
    QuiverError::CardinalityMismatch {
        reference: reference.clone(),
        relationship: name.to_string(),
        expected: rel.cardinality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiver::Arrow;
    use crate::test_fixtures::{care_bear_graph, care_bear_schema};
    use serde_json::json;

    fn bear(id: &str) -> Reference {
        Reference::new("bears", id)
    }

    fn home(id: &str) -> Reference {
        Reference::new("homes", id)
    }

    #[test]
    fn test_to_one_change_updates_both_inverse_sides() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let mut quiver = ResourceQuiver::new(&schema, &graph);

        quiver.assert_relationship(&bear("1"), "home", &home("2")).unwrap();
        let changes = quiver.into_change_set();

        assert!(changes.arrows_added.contains(&Arrow::new(bear("1"), "home", home("2"))));
        assert!(changes.arrows_added.contains(&Arrow::new(home("2"), "residents", bear("1"))));
        assert!(changes.arrows_removed.contains(&Arrow::new(bear("1"), "home", home("1"))));
        assert!(changes.arrows_removed.contains(&Arrow::new(home("1"), "residents", bear("1"))));
    }

    #[test]
    fn test_to_one_inverse_displaces_old_holder() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let mut quiver = ResourceQuiver::new(&schema, &graph);

        // Cheer and Wish are each other's best friends
        quiver.assert_relationship(&bear("1"), "bestFriend", &bear("3")).unwrap();
        let changes = quiver.into_change_set();

        assert!(changes.arrows_added.contains(&Arrow::new(bear("1"), "bestFriend", bear("3"))));
        assert!(changes.arrows_added.contains(&Arrow::new(bear("3"), "bestFriend", bear("1"))));
        assert!(changes.arrows_removed.contains(&Arrow::new(bear("3"), "bestFriend", bear("2"))));
        assert!(changes.arrows_removed.contains(&Arrow::new(bear("2"), "bestFriend", bear("3"))));
    }

    #[test]
    fn test_many_replacement_diffs_inverses() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let mut quiver = ResourceQuiver::new(&schema, &graph);

        let resource = Resource::new("homes", "1").with_many("residents", vec![bear("1"), bear("5")]);
        quiver.assert_resource(&resource).unwrap();
        let changes = quiver.into_change_set();

        let group = changes
            .complete_groups
            .iter()
            .find(|g| g.source == home("1"))
            .unwrap();
        assert_eq!(group.targets, vec![bear("1"), bear("5")]);

        assert!(changes.arrows_removed.contains(&Arrow::new(home("1"), "residents", bear("2"))));
        assert!(changes.arrows_removed.contains(&Arrow::new(bear("2"), "home", home("1"))));
        assert!(changes.arrows_removed.contains(&Arrow::new(bear("3"), "home", home("1"))));
        assert!(changes.arrows_added.contains(&Arrow::new(bear("5"), "home", home("1"))));
    }

    #[test]
    fn test_retract_resource_detaches_links() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let mut quiver = ResourceQuiver::new(&schema, &graph);

        quiver.retract_resource(&bear("3")).unwrap();
        let changes = quiver.into_change_set();

        assert_eq!(changes.deletes, vec![bear("3")]);
        assert!(changes.arrows_removed.contains(&Arrow::new(home("1"), "residents", bear("3"))));
        assert!(changes.arrows_removed.contains(&Arrow::new(bear("2"), "bestFriend", bear("3"))));
        assert!(changes
            .arrows_removed
            .contains(&Arrow::new(Reference::new("powers", "makeWish"), "wielders", bear("3"))));
    }

    #[test]
    fn test_assert_tree() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let mut quiver = ResourceQuiver::new(&schema, &graph);

        let root = quiver
            .assert_tree(
                "bears",
                &json!({
                    "id": "6",
                    "name": "Funshine Bear",
                    "home": {"id": "2", "caringMeter": 0.75},
                    "powers": ["careBearStare"]
                }),
            )
            .unwrap();
        assert_eq!(root, bear("6"));

        let nodes = quiver.quiver().get_nodes();
        assert_eq!(nodes[&bear("6")].as_ref().unwrap()["name"], json!("Funshine Bear"));
        assert_eq!(nodes[&home("2")].as_ref().unwrap()["caringMeter"], json!(0.75));

        let changes = quiver.into_change_set();
        assert!(changes.arrows_added.contains(&Arrow::new(home("2"), "residents", bear("6"))));
        assert!(changes.arrows_added.contains(&Arrow::new(
            Reference::new("powers", "careBearStare"),
            "wielders",
            bear("6")
        )));
    }

    #[test]
    fn test_tree_validation() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();

        let mut quiver = ResourceQuiver::new(&schema, &graph);
        let err = quiver.assert_tree("bears", &json!({"name": "No Id"})).unwrap_err();
        assert_eq!(err, QuiverError::MissingId("bears".to_string()));

        let mut quiver = ResourceQuiver::new(&schema, &graph);
        let err = quiver
            .assert_tree("bears", &json!({"id": "7", "wingspan": 3}))
            .unwrap_err();
        assert!(matches!(err, QuiverError::UnknownAttribute { .. }));

        let mut quiver = ResourceQuiver::new(&schema, &graph);
        let err = quiver
            .assert_tree("bears", &json!({"id": "7", "yearIntroduced": "new"}))
            .unwrap_err();
        assert!(matches!(err, QuiverError::AttributeType { .. }));

        let mut quiver = ResourceQuiver::new(&schema, &graph);
        let err = quiver
            .assert_tree("bears", &json!({"id": "7", "powers": "careBearStare"}))
            .unwrap_err();
        assert!(matches!(err, QuiverError::CardinalityMismatch { .. }));
    }

    #[test]
    fn test_contradictory_tree_fails() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let mut quiver = ResourceQuiver::new(&schema, &graph);

        // the same home asserted twice with different names
        let err = quiver
            .assert_tree(
                "bears",
                &json!({
                    "id": "6",
                    "home": {"id": "2", "name": "Forest of Feelings"},
                    "bestFriend": {"id": "7", "home": {"id": "2", "name": "Elsewhere"}}
                }),
            )
            .unwrap_err();
        assert!(matches!(err, QuiverError::ConflictingProperties { .. }));
    }
}
