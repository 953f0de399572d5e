//! Schema model
//!
//! Compiled resource, attribute and relationship declarations with inverse lookups.
//! A `Schema` is compiled once and is immutable afterward; everything else in the
//! crate borrows it.

pub mod compile;
pub mod types;

pub use compile::{SchemaError, SchemaResult, SchemaViolation};
pub use types::{
    AttributeDecl, AttributeType, Cardinality, RelationshipDef, ResourceDef, SchemaDefinition,
};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::info;

/// Compiled, validated schema
#[derive(Debug, Clone)]
pub struct Schema {
    resources: IndexMap<String, ResourceDef>,
}

impl Schema {
    /// Compile a raw definition, failing with every violated constraint.
    pub fn compile(definition: SchemaDefinition) -> SchemaResult<Self> {
        let violations = compile::validate(&definition);
        if !violations.is_empty() {
            return Err(SchemaError::Invalid(violations));
        }

        info!(
            "Compiled schema with {} resource types",
            definition.resources.len()
        );

        Ok(Self {
            resources: definition.resources,
        })
    }

    pub fn from_value(value: Value) -> SchemaResult<Self> {
        let definition: SchemaDefinition = serde_json::from_value(value)?;
        Self::compile(definition)
    }

    pub fn from_json_str(source: &str) -> SchemaResult<Self> {
        let definition: SchemaDefinition = serde_json::from_str(source)?;
        Self::compile(definition)
    }

    pub fn from_yaml_str(source: &str) -> SchemaResult<Self> {
        let definition: SchemaDefinition = serde_yaml::from_str(source)?;
        Self::compile(definition)
    }

    /// Get a resource definition by type name
    pub fn resource(&self, resource_type: &str) -> Option<&ResourceDef> {
        self.resources.get(resource_type)
    }

    /// All declared resource type names
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn has_resource(&self, resource_type: &str) -> bool {
        self.resources.contains_key(resource_type)
    }

    pub fn relationship(&self, resource_type: &str, name: &str) -> Option<&RelationshipDef> {
        self.resource(resource_type)?.relationship(name)
    }

    /// Resolve the inverse of a relationship.
    ///
    /// Returns the target type, the inverse relationship's name and its definition.
    pub fn inverse(
        &self,
        resource_type: &str,
        name: &str,
    ) -> Option<(&str, &str, &RelationshipDef)> {
        let rel = self.relationship(resource_type, name)?;
        let inverse_name = rel.inverse.as_deref()?;
        let inverse = self.relationship(&rel.target_type, inverse_name)?;
        Some((rel.target_type.as_str(), inverse_name, inverse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::care_bear_schema;
    use serde_json::json;

    #[test]
    fn test_compile_care_bears() {
        let schema = care_bear_schema();
        assert!(schema.has_resource("bears"));
        assert_eq!(schema.resource_types().count(), 3);
        assert_eq!(schema.resource("powers").unwrap().id_attribute, "powerId");
    }

    #[test]
    fn test_inverse_lookup() {
        let schema = care_bear_schema();

        let (target, name, def) = schema.inverse("bears", "home").unwrap();
        assert_eq!(target, "homes");
        assert_eq!(name, "residents");
        assert_eq!(def.cardinality, Cardinality::Many);

        assert!(schema.inverse("homes", "missing").is_none());
    }

    #[test]
    fn test_unknown_related_type_and_missing_inverse_are_all_reported() {
        let result = Schema::from_value(json!({
            "resources": {
                "bears": {
                    "attributes": { "id": "string" },
                    "relationships": {
                        "home": { "type": "homes", "cardinality": "one", "inverse": "residents" },
                        "den": { "type": "caves", "cardinality": "one" }
                    }
                },
                "homes": {
                    "attributes": { "id": "string" },
                    "relationships": {}
                }
            }
        }));

        let err = result.unwrap_err();
        let violations = err.violations();
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], SchemaViolation::MissingInverse { .. }));
        assert!(matches!(violations[1], SchemaViolation::UnknownRelatedType { .. }));
    }

    #[test]
    fn test_inverse_must_point_back() {
        let result = Schema::from_value(json!({
            "resources": {
                "bears": {
                    "attributes": { "id": "string" },
                    "relationships": {
                        "home": { "type": "homes", "cardinality": "one", "inverse": "owner" }
                    }
                },
                "homes": {
                    "attributes": { "id": "string" },
                    "relationships": {
                        "owner": { "type": "homes", "cardinality": "one" }
                    }
                }
            }
        }));

        let err = result.unwrap_err();
        assert!(matches!(
            err.violations()[0],
            SchemaViolation::InverseTypeMismatch { .. }
        ));
    }

    #[test]
    fn test_missing_id_attribute() {
        let result = Schema::from_value(json!({
            "resources": {
                "bears": { "idAttribute": "bearId", "attributes": { "name": "string" } }
            }
        }));

        assert!(matches!(
            result.unwrap_err().violations()[0],
            SchemaViolation::MissingIdAttribute { .. }
        ));
    }

    #[test]
    fn test_from_yaml() {
        let schema = Schema::from_yaml_str(
            r#"
resources:
  bears:
    attributes:
      id: string
      name: string
    relationships:
      home: { type: homes, cardinality: one, inverse: residents }
  homes:
    attributes:
      id: string
    relationships:
      residents: { type: bears, cardinality: many, inverse: home }
"#,
        )
        .unwrap();

        assert_eq!(
            schema.relationship("homes", "residents").unwrap().target_type,
            "bears"
        );
    }

    #[test]
    fn test_malformed_document() {
        let result = Schema::from_json_str("{\"resources\": 4}");
        assert!(matches!(result, Err(SchemaError::Json(_))));
    }
}
