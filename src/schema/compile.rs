//! Schema compilation and validation
//!
//! A schema is validated once, up front. Every violated constraint is collected so a
//! misconfigured schema reports all of its problems at startup instead of one at a time.

use super::types::SchemaDefinition;
use std::fmt;
use thiserror::Error;

/// A single violated schema constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// A relationship targets a resource type that is not declared
    UnknownRelatedType {
        resource_type: String,
        relationship: String,
        target_type: String,
    },
    /// A declared inverse does not exist on the target type
    MissingInverse {
        resource_type: String,
        relationship: String,
        target_type: String,
        inverse: String,
    },
    /// A declared inverse exists but points at some other type
    InverseTypeMismatch {
        resource_type: String,
        relationship: String,
        inverse: String,
        inverse_target: String,
    },
    /// The inverse declares its own inverse, and it is not this relationship
    AsymmetricInverse {
        resource_type: String,
        relationship: String,
        inverse: String,
        inverse_of_inverse: String,
    },
    /// The id attribute is not among the declared attributes
    MissingIdAttribute {
        resource_type: String,
        id_attribute: String,
    },
    /// An attribute and a relationship share a name
    NameCollision { resource_type: String, name: String },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::UnknownRelatedType {
                resource_type,
                relationship,
                target_type,
            } => write!(
                f,
                "{}.{} targets unknown type '{}'",
                resource_type, relationship, target_type
            ),
            SchemaViolation::MissingInverse {
                resource_type,
                relationship,
                target_type,
                inverse,
            } => write!(
                f,
                "{}.{} declares inverse '{}' which does not exist on '{}'",
                resource_type, relationship, inverse, target_type
            ),
            SchemaViolation::InverseTypeMismatch {
                resource_type,
                relationship,
                inverse,
                inverse_target,
            } => write!(
                f,
                "{}.{} declares inverse '{}' which points at '{}' instead of '{}'",
                resource_type, relationship, inverse, inverse_target, resource_type
            ),
            SchemaViolation::AsymmetricInverse {
                resource_type,
                relationship,
                inverse,
                inverse_of_inverse,
            } => write!(
                f,
                "{}.{} declares inverse '{}' whose own inverse is '{}'",
                resource_type, relationship, inverse, inverse_of_inverse
            ),
            SchemaViolation::MissingIdAttribute {
                resource_type,
                id_attribute,
            } => write!(
                f,
                "{} uses id attribute '{}' which is not declared",
                resource_type, id_attribute
            ),
            SchemaViolation::NameCollision {
                resource_type,
                name,
            } => write!(
                f,
                "{} declares '{}' as both an attribute and a relationship",
                resource_type, name
            ),
        }
    }
}

/// Schema configuration errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema: {}", join_violations(.0))]
    Invalid(Vec<SchemaViolation>),

    #[error("Schema JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    /// Violations carried by an `Invalid` error, empty for parse errors
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            SchemaError::Invalid(v) => v,
            _ => &[],
        }
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a raw schema definition, collecting every violation.
pub(crate) fn validate(definition: &SchemaDefinition) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();

    for (type_name, resource) in &definition.resources {
        if !resource.has_attribute(&resource.id_attribute) {
            violations.push(SchemaViolation::MissingIdAttribute {
                resource_type: type_name.clone(),
                id_attribute: resource.id_attribute.clone(),
            });
        }

        for (rel_name, rel) in &resource.relationships {
            if resource.has_attribute(rel_name) {
                violations.push(SchemaViolation::NameCollision {
                    resource_type: type_name.clone(),
                    name: rel_name.clone(),
                });
            }

            let Some(target) = definition.resources.get(&rel.target_type) else {
                violations.push(SchemaViolation::UnknownRelatedType {
                    resource_type: type_name.clone(),
                    relationship: rel_name.clone(),
                    target_type: rel.target_type.clone(),
                });
                continue;
            };

            let Some(inverse_name) = &rel.inverse else {
                continue;
            };

            match target.relationships.get(inverse_name) {
                None => violations.push(SchemaViolation::MissingInverse {
                    resource_type: type_name.clone(),
                    relationship: rel_name.clone(),
                    target_type: rel.target_type.clone(),
                    inverse: inverse_name.clone(),
                }),
                Some(inverse) if &inverse.target_type != type_name => {
                    violations.push(SchemaViolation::InverseTypeMismatch {
                        resource_type: type_name.clone(),
                        relationship: rel_name.clone(),
                        inverse: inverse_name.clone(),
                        inverse_target: inverse.target_type.clone(),
                    })
                }
                Some(inverse) => {
                    if let Some(back) = &inverse.inverse {
                        if back != rel_name {
                            violations.push(SchemaViolation::AsymmetricInverse {
                                resource_type: type_name.clone(),
                                relationship: rel_name.clone(),
                                inverse: inverse_name.clone(),
                                inverse_of_inverse: back.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    violations
}
