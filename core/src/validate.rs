//! Entity validation against a merged schema.
//!
//! Checks the structural invariants of an entity tree: every field belongs
//! to the entity's bundle, literals sit only under leaf fields, nested
//! entities only under bundle fields and of the field's target bundle, and
//! `One` fields hold at most one value.
//!
//! # Examples
//!
//! ```
//! use wisski_core::*;
//!
//! let schema = merge([vec![Path::leaf("date", "production").single()]]).unwrap();
//!
//! let ok = Entity::new("production").with("date", ["2020"]);
//! assert!(validate_entity(&ok, &schema).is_ok());
//!
//! let bad = Entity::new("production").with("date", ["2020", "2021"]);
//! assert!(matches!(
//!     validate_entity(&bad, &schema),
//!     Err(ValidationError::Cardinality { count: 2, .. })
//! ));
//! ```

use thiserror::Error;

use crate::{Entity, MergedSchema, Value};

/// Entity validation errors.
///
/// Each variant names the bundle and field where the tree breaks the
/// schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The bundle is not part of the schema.
    #[error("unknown bundle: {0}")]
    UnknownBundle(String),
    /// The field is not defined for the bundle.
    #[error("unknown field {field_id} in bundle {bundle_id}")]
    UnknownField {
        /// Bundle of the offending entity.
        bundle_id: String,
        /// The undefined field.
        field_id: String,
    },
    /// A `One` field holds more than one value.
    #[error("field {field_id} in bundle {bundle_id} allows one value, got {count}")]
    Cardinality {
        /// Bundle of the offending entity.
        bundle_id: String,
        /// The over-full field.
        field_id: String,
        /// Number of values found.
        count: usize,
    },
    /// A literal under a bundle field, or an entity under a leaf field.
    #[error("field {field_id} in bundle {bundle_id} expects {expected} values")]
    ShapeMismatch {
        /// Bundle of the offending entity.
        bundle_id: String,
        /// The field holding the wrong kind of value.
        field_id: String,
        /// `"literal"` or `"entity"`.
        expected: &'static str,
    },
    /// A nested entity belongs to a different bundle than the field targets.
    #[error("field {field_id} expects {expected} entities, got {found}")]
    BundleMismatch {
        /// The bundle field.
        field_id: String,
        /// The field's target bundle.
        expected: String,
        /// The nested entity's bundle.
        found: String,
    },
}

/// Validates an entity tree recursively.
///
/// Stops at the first problem found, walking fields in assignment order and
/// nested entities depth-first.
pub fn validate_entity(entity: &Entity, schema: &MergedSchema) -> Result<(), ValidationError> {
    let bundle_id = entity.bundle_id();
    if !schema.contains_bundle(bundle_id) {
        return Err(ValidationError::UnknownBundle(bundle_id.to_string()));
    }

    for (field_id, values) in entity.fields() {
        let node = schema
            .node(field_id)
            .filter(|node| node.bundle_id == bundle_id)
            .ok_or_else(|| ValidationError::UnknownField {
                bundle_id: bundle_id.to_string(),
                field_id: field_id.to_string(),
            })?;

        if !node.cardinality.allows(values.len()) {
            return Err(ValidationError::Cardinality {
                bundle_id: bundle_id.to_string(),
                field_id: field_id.to_string(),
                count: values.len(),
            });
        }

        for value in values {
            match (value, node.target_bundle()) {
                (Value::Literal(_), None) => {}
                (Value::Entity(child), Some(target)) => {
                    if child.bundle_id() != target {
                        return Err(ValidationError::BundleMismatch {
                            field_id: field_id.to_string(),
                            expected: target.to_string(),
                            found: child.bundle_id().to_string(),
                        });
                    }
                    validate_entity(child, schema)?;
                }
                (Value::Literal(_), Some(_)) => {
                    return Err(ValidationError::ShapeMismatch {
                        bundle_id: bundle_id.to_string(),
                        field_id: field_id.to_string(),
                        expected: "entity",
                    });
                }
                (Value::Entity(_), None) => {
                    return Err(ValidationError::ShapeMismatch {
                        bundle_id: bundle_id.to_string(),
                        field_id: field_id.to_string(),
                        expected: "literal",
                    });
                }
            }
        }
    }

    Ok(())
}
