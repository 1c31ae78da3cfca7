//! Core schema and entity types for WissKI bundles.
//!
//! This crate defines the foundational model shared by the tabular and
//! remote mappers:
//!
//! - [`Path`] / [`SchemaNode`] — one field of one bundle, either a leaf
//!   field or a bundle field nesting another bundle.
//! - [`SchemaTree`] — one pathbuilder, parsed from the remote's nested
//!   document or built from a path list.
//! - [`MergedSchema`] — the union of several pathbuilders, built by
//!   [`merge`] / [`merge_trees`], which reject conflicting definitions and
//!   bundle cycles.
//! - [`Entity`] / [`Value`] — the runtime tree of bundle instances.
//!
//! Validation ([`validate_entity`]) checks an entity tree against a merged
//! schema: known fields, value shape and cardinality.
//!
//! # Example
//!
//! ```
//! use wisski_core::*;
//!
//! let objects = SchemaTree::new(
//!     "objects",
//!     vec![
//!         Path::leaf("title", "object"),
//!         Path::bundle("production", "object", "production").single(),
//!     ],
//! );
//! let events = SchemaTree::new("events", vec![Path::leaf("date", "production").single()]);
//! let schema = merge_trees(&[objects, events]).unwrap();
//!
//! let object = Entity::new("object")
//!     .with("title", ["A", "B"])
//!     .with("production", [Entity::new("production").with("date", ["2020"])]);
//!
//! assert!(validate_entity(&object, &schema).is_ok());
//! assert_eq!(schema.node("date").unwrap().parent_bundle_id.as_deref(), Some("object"));
//! ```

mod entity;
mod merge;
mod pathbuilder;
mod types;
mod validate;

pub use entity::{Entity, Value};
pub use merge::{MergedSchema, SchemaError, merge, merge_trees};
pub use pathbuilder::SchemaTree;
pub use types::*;
pub use validate::{ValidationError, validate_entity};
