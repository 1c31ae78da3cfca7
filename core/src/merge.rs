//! Pathbuilder merging into a single field→bundle lookup.
//!
//! Entities of one bundle may draw their fields from several independently
//! authored pathbuilders. [`merge`] combines any number of path lists into a
//! [`MergedSchema`], accepting identical redefinitions of a field and
//! rejecting incompatible ones. The parent-bundle relation of the result is
//! checked for cycles before the schema is handed out, so tree operations
//! can recurse over it without a guard.
//!
//! # Example
//!
//! ```
//! use wisski_core::*;
//!
//! let base = vec![
//!     Path::leaf("title", "object"),
//!     Path::bundle("production", "object", "production").single(),
//! ];
//! let extra = vec![Path::leaf("date", "production").single()];
//!
//! let schema = merge([base, extra]).unwrap();
//! assert_eq!(schema.bundle_fields("object"), ["title", "production"]);
//! assert_eq!(schema.parent_of("production"), Some("object"));
//! assert_eq!(schema.roots().collect::<Vec<_>>(), ["object"]);
//! ```

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{FieldKind, Path, SchemaNode, SchemaTree};

/// Errors raised while building a merged schema.
///
/// A failed merge yields no schema at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two definitions of one field id disagree, or one bundle is nested
    /// under two different bundles.
    #[error("conflicting definitions for field {field_id}: {details}")]
    Conflict {
        /// The field whose definitions disagree.
        field_id: String,
        /// What differs.
        details: String,
    },
    /// The parent-bundle relation loops back on itself.
    #[error("bundle cycle detected: {}", path.join(" -> "))]
    Cycle {
        /// Bundles on the cycle, first and last entries equal.
        path: Vec<String>,
    },
    /// A path lacks a field id or an owning bundle.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A pathbuilder document could not be interpreted.
    #[error("invalid pathbuilder {pathbuilder_id}: {details}")]
    InvalidPathbuilder {
        /// Pathbuilder id, `<unknown>` when the document has none.
        pathbuilder_id: String,
        /// What is wrong with it.
        details: String,
    },
}

/// The union of one or more path lists.
///
/// Lookups by field id are O(1). Per bundle, field ids keep the order in
/// which they were first seen, which fixes CSV column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedSchema {
    fields: IndexMap<String, SchemaNode>,
    bundles: IndexMap<String, Vec<String>>,
    parents: IndexMap<String, String>,
    path_ids: IndexMap<String, String>,
}

impl MergedSchema {
    /// Looks up a field by id.
    pub fn node(&self, field_id: &str) -> Option<&SchemaNode> {
        self.fields.get(field_id)
    }

    /// Maps a pathbuilder path id to the field it declares.
    ///
    /// A field redefined by several pathbuilders answers to each of their
    /// path ids.
    pub fn field_for_path(&self, path_id: &str) -> Option<&str> {
        self.path_ids.get(path_id).map(String::as_str)
    }

    /// Returns the direct field ids of a bundle in schema order.
    ///
    /// Unknown bundles have no fields.
    pub fn bundle_fields(&self, bundle_id: &str) -> &[String] {
        self.bundles
            .get(bundle_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the direct fields of a bundle in schema order.
    pub fn fields_of<'a>(
        &'a self,
        bundle_id: &str,
    ) -> impl Iterator<Item = &'a SchemaNode> + use<'a> {
        self.bundle_fields(bundle_id)
            .iter()
            .filter_map(|field_id| self.fields.get(field_id))
    }

    /// Returns `true` if the bundle owns fields or is the target of one.
    pub fn contains_bundle(&self, bundle_id: &str) -> bool {
        self.bundles.contains_key(bundle_id)
    }

    /// Returns all known bundle ids.
    pub fn bundles(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Returns bundles that are not nested under any other bundle.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.bundles
            .keys()
            .filter(|bundle| !self.parents.contains_key(*bundle))
            .map(String::as_str)
    }

    /// Returns the bundle enclosing `bundle_id`.
    pub fn parent_of(&self, bundle_id: &str) -> Option<&str> {
        self.parents.get(bundle_id).map(String::as_str)
    }

    /// Returns `bundle_id` followed by every bundle nested below it,
    /// breadth-first.
    pub fn subtree_bundles(&self, bundle_id: &str) -> Vec<String> {
        if !self.contains_bundle(bundle_id) {
            return Vec::new();
        }
        let mut ordered = vec![bundle_id.to_string()];
        let mut next = 0;
        while next < ordered.len() {
            let current = ordered[next].clone();
            for node in self.fields_of(&current) {
                if let Some(target) = node.target_bundle() {
                    if !ordered.iter().any(|b| b == target) {
                        ordered.push(target.to_string());
                    }
                }
            }
            next += 1;
        }
        ordered
    }

    /// Returns `true` if `field_id` belongs to `bundle_id` or to a bundle
    /// nested below it.
    pub fn is_field_in_subtree(&self, bundle_id: &str, field_id: &str) -> bool {
        let Some(node) = self.fields.get(field_id) else {
            return false;
        };
        let mut current = Some(node.bundle_id.as_str());
        while let Some(bundle) = current {
            if bundle == bundle_id {
                return true;
            }
            current = self.parent_of(bundle);
        }
        false
    }

    /// Returns the number of distinct fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn declare_bundle(&mut self, bundle_id: &str) {
        self.bundles.entry(bundle_id.to_string()).or_default();
    }

    fn insert(&mut self, path: &Path) -> Result<(), SchemaError> {
        if path.id.trim().is_empty() {
            return Err(SchemaError::InvalidPath(format!(
                "empty field id in bundle {}",
                path.bundle_id
            )));
        }
        if path.bundle_id.trim().is_empty() {
            return Err(SchemaError::InvalidPath(format!(
                "field {} has no bundle",
                path.id
            )));
        }

        self.register_path_id(path)?;

        if let Some(existing) = self.fields.get_mut(&path.id) {
            let mut differences = Vec::new();
            if existing.bundle_id != path.bundle_id {
                differences.push(format!(
                    "bundle {} vs {}",
                    existing.bundle_id, path.bundle_id
                ));
            }
            if existing.kind != path.kind {
                differences.push(format!(
                    "kind {} vs {}",
                    describe_kind(&existing.kind),
                    describe_kind(&path.kind)
                ));
            }
            if existing.cardinality != path.cardinality {
                differences.push(format!(
                    "cardinality {:?} vs {:?}",
                    existing.cardinality, path.cardinality
                ));
            }
            if !differences.is_empty() {
                return Err(SchemaError::Conflict {
                    field_id: path.id.clone(),
                    details: differences.join(", "),
                });
            }

            if existing.path_id.is_none() {
                existing.path_id = path.path_id.clone();
            }
            if existing.field_type.is_none() {
                existing.field_type = path.field_type.clone();
            } else if path.field_type.is_some() && existing.field_type != path.field_type {
                warn!(
                    field = %path.id,
                    kept = ?existing.field_type,
                    ignored = ?path.field_type,
                    "Field type differs between pathbuilders"
                );
            }
            debug!(field = %path.id, bundle = %path.bundle_id, "Field already defined, merged");
            return Ok(());
        }

        self.fields
            .insert(path.id.clone(), SchemaNode::from_path(path));
        self.bundles
            .entry(path.bundle_id.clone())
            .or_default()
            .push(path.id.clone());
        if let Some(target) = path.target_bundle() {
            self.declare_bundle(target);
        }
        Ok(())
    }

    fn register_path_id(&mut self, path: &Path) -> Result<(), SchemaError> {
        let Some(path_id) = &path.path_id else {
            return Ok(());
        };
        match self.path_ids.get(path_id) {
            Some(field_id) if field_id != &path.id => Err(SchemaError::Conflict {
                field_id: path.id.clone(),
                details: format!("path {path_id} already declares field {field_id}"),
            }),
            Some(_) => Ok(()),
            None => {
                self.path_ids.insert(path_id.clone(), path.id.clone());
                Ok(())
            }
        }
    }

    fn link_parents(&mut self) -> Result<(), SchemaError> {
        let mut parents: IndexMap<String, String> = IndexMap::new();
        for node in self.fields.values() {
            let Some(target) = node.target_bundle() else {
                continue;
            };
            match parents.get(target) {
                Some(parent) if parent != &node.bundle_id => {
                    return Err(SchemaError::Conflict {
                        field_id: node.id.clone(),
                        details: format!(
                            "bundle {target} is already nested under {parent}, not {}",
                            node.bundle_id
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    parents.insert(target.to_string(), node.bundle_id.clone());
                }
            }
        }

        for bundle in self.bundles.keys() {
            let mut chain = vec![bundle.clone()];
            let mut current = bundle;
            while let Some(parent) = parents.get(current) {
                if let Some(start) = chain.iter().position(|b| b == parent) {
                    let mut path = chain[start..].to_vec();
                    path.push(parent.clone());
                    return Err(SchemaError::Cycle { path });
                }
                chain.push(parent.clone());
                current = parent;
            }
        }

        for node in self.fields.values_mut() {
            node.parent_bundle_id = parents.get(&node.bundle_id).cloned();
        }
        self.parents = parents;
        Ok(())
    }
}

fn describe_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Leaf => "leaf".to_string(),
        FieldKind::Bundle(target) => format!("bundle({target})"),
    }
}

/// Merges path lists into one schema.
///
/// Identical definitions of a field id across lists collapse into one field;
/// definitions that disagree on owning bundle, kind or cardinality fail with
/// [`SchemaError::Conflict`]. Cycles in the parent-bundle relation fail with
/// [`SchemaError::Cycle`].
///
/// # Examples
///
/// ```
/// use wisski_core::*;
///
/// let a = vec![Path::leaf("x", "object")];
/// let b = vec![Path::leaf("x", "person")];
/// let err = merge([a, b]).unwrap_err();
/// assert!(matches!(err, SchemaError::Conflict { .. }));
/// ```
pub fn merge<L>(path_lists: L) -> Result<MergedSchema, SchemaError>
where
    L: IntoIterator,
    L::Item: AsRef<[Path]>,
{
    let mut schema = MergedSchema::default();
    let mut sources = 0;
    for list in path_lists {
        for path in list.as_ref() {
            schema.insert(path)?;
        }
        sources += 1;
    }
    schema.link_parents()?;

    debug!(
        sources,
        fields = schema.len(),
        bundles = schema.bundles.len(),
        "Merged schema"
    );
    Ok(schema)
}

/// Merges pathbuilders, keeping root bundles they declare even when those
/// bundles have no fields yet.
pub fn merge_trees(trees: &[SchemaTree]) -> Result<MergedSchema, SchemaError> {
    let mut schema = MergedSchema::default();
    for tree in trees {
        for root in tree.roots() {
            schema.declare_bundle(root);
        }
        for path in tree.paths() {
            schema.insert(path)?;
        }
    }
    schema.link_parents()?;

    debug!(
        pathbuilders = trees.len(),
        fields = schema.len(),
        bundles = schema.bundles.len(),
        "Merged pathbuilders"
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cardinality;

    fn object_paths() -> Vec<Path> {
        vec![
            Path::leaf("title", "object"),
            Path::bundle("production", "object", "production").single(),
            Path::leaf("date", "production").single(),
        ]
    }

    #[test]
    fn test_merge_same_list_twice_is_idempotent() {
        let once = merge([object_paths()]).unwrap();
        let twice = merge([object_paths(), object_paths()]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 3);
    }

    #[test]
    fn test_merge_unions_fields_of_same_bundle() {
        let extra = vec![Path::leaf("inventory_number", "object").single()];
        let schema = merge([object_paths(), extra]).unwrap();
        assert_eq!(
            schema.bundle_fields("object"),
            ["title", "production", "inventory_number"]
        );
    }

    #[test]
    fn test_merge_rejects_field_under_different_bundle() {
        let other = vec![Path::leaf("title", "person")];
        let err = merge([object_paths(), other]).unwrap_err();
        match err {
            SchemaError::Conflict { field_id, details } => {
                assert_eq!(field_id, "title");
                assert!(details.contains("bundle object vs person"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_merge_rejects_cardinality_disagreement() {
        let other = vec![Path::leaf("date", "production")];
        let err = merge([object_paths(), other]).unwrap_err();
        assert!(matches!(err, SchemaError::Conflict { ref field_id, .. } if field_id == "date"));
    }

    #[test]
    fn test_merge_rejects_leaf_redefined_as_bundle() {
        let other = vec![Path::bundle("title", "object", "title_bundle")];
        let err = merge([object_paths(), other]).unwrap_err();
        assert!(matches!(err, SchemaError::Conflict { .. }));
    }

    #[test]
    fn test_merge_rejects_bundle_with_two_parents() {
        let other = vec![Path::bundle("made_by", "person", "production")];
        let err = merge([object_paths(), other]).unwrap_err();
        assert!(matches!(err, SchemaError::Conflict { ref field_id, .. } if field_id == "made_by"));
    }

    #[test]
    fn test_merge_detects_two_bundle_cycle() {
        let paths = vec![
            Path::bundle("a_to_b", "a", "b"),
            Path::bundle("b_to_a", "b", "a"),
        ];
        let err = merge([paths]).unwrap_err();
        match err {
            SchemaError::Cycle { path } => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&"a".to_string()));
                assert!(path.contains(&"b".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_merge_detects_self_reference() {
        let paths = vec![Path::bundle("part_of", "object", "object")];
        let err = merge([paths]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::Cycle {
                path: vec!["object".to_string(), "object".to_string()]
            }
        );
    }

    #[test]
    fn test_merge_rejects_empty_field_id() {
        let err = merge([vec![Path::leaf("", "object")]]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPath(_)));
    }

    #[test]
    fn test_merge_sets_parent_bundle_on_nodes() {
        let schema = merge([object_paths()]).unwrap();
        assert_eq!(schema.node("title").unwrap().parent_bundle_id, None);
        assert_eq!(
            schema.node("date").unwrap().parent_bundle_id.as_deref(),
            Some("object")
        );
        assert_eq!(schema.node("date").unwrap().cardinality, Cardinality::One);
    }

    #[test]
    fn test_merge_keeps_first_field_type() {
        let a = vec![Path::leaf("title", "object").with_field_type("string")];
        let b = vec![Path::leaf("title", "object").with_field_type("text_long")];
        let schema = merge([a, b]).unwrap();
        assert_eq!(
            schema.node("title").unwrap().field_type.as_deref(),
            Some("string")
        );
    }

    #[test]
    fn test_subtree_bundles_breadth_first() {
        let mut paths = object_paths();
        paths.push(Path::bundle("actor", "production", "person"));
        paths.push(Path::leaf("name", "person"));
        let schema = merge([paths]).unwrap();
        assert_eq!(
            schema.subtree_bundles("object"),
            ["object", "production", "person"]
        );
        assert!(schema.subtree_bundles("missing").is_empty());
        assert!(schema.is_field_in_subtree("object", "name"));
        assert!(!schema.is_field_in_subtree("production", "title"));
    }

    #[test]
    fn test_field_for_path_maps_every_declaring_path() {
        let first = vec![Path::leaf("title", "object").with_path_id("p_title")];
        let second = vec![Path::leaf("title", "object").with_path_id("p_object_title")];
        let schema = merge([first, second]).unwrap();
        assert_eq!(schema.field_for_path("p_title"), Some("title"));
        assert_eq!(schema.field_for_path("p_object_title"), Some("title"));
        assert_eq!(schema.node("title").unwrap().path_id.as_deref(), Some("p_title"));
        assert_eq!(schema.field_for_path("title"), None);
    }

    #[test]
    fn test_merge_rejects_path_id_for_two_fields() {
        let first = vec![Path::leaf("title", "object").with_path_id("p1")];
        let second = vec![Path::leaf("name", "person").with_path_id("p1")];
        let err = merge([first, second]).unwrap_err();
        assert!(matches!(err, SchemaError::Conflict { ref field_id, .. } if field_id == "name"));
    }
}
