//! Schema type definitions for bundle structure modeling.
//!
//! A schema is described by [`Path`]s: each path declares one field of one
//! bundle, either a leaf field holding literal values or a bundle field
//! holding nested entities of another bundle. The merger turns paths into
//! [`SchemaNode`]s, which additionally know the bundle enclosing their owner.

use serde::{Deserialize, Serialize};

/// How many values a field may hold.
///
/// # Examples
///
/// ```
/// use wisski_core::Cardinality;
///
/// assert!(Cardinality::One.allows(1));
/// assert!(!Cardinality::One.allows(2));
/// assert!(Cardinality::Many.allows(2));
/// assert_eq!(Cardinality::default(), Cardinality::Many);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// At most one value.
    One,
    /// Any number of values (the default).
    #[default]
    Many,
}

impl Cardinality {
    /// Returns `true` if `count` values fit this cardinality.
    pub fn allows(self, count: usize) -> bool {
        match self {
            Cardinality::One => count <= 1,
            Cardinality::Many => true,
        }
    }
}

/// Whether a field holds literals or nested entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Literal string values.
    #[default]
    Leaf,
    /// Nested entities of the named bundle.
    Bundle(String),
}

/// One field declaration as found in a pathbuilder.
///
/// Use [`leaf`](Path::leaf) and [`bundle`](Path::bundle) to create paths,
/// then chain builder methods.
///
/// # Examples
///
/// ```
/// use wisski_core::{Cardinality, Path};
///
/// let title = Path::leaf("title", "object").allow_many();
/// assert!(!title.is_bundle_field());
/// assert_eq!(title.cardinality, Cardinality::Many);
///
/// let production = Path::bundle("production", "object", "production").single();
/// assert_eq!(production.target_bundle(), Some("production"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// Field id, the key used in entity field maps and CSV headers.
    pub id: String,
    /// Bundle owning this field.
    pub bundle_id: String,
    /// Leaf or bundle field.
    #[serde(default)]
    pub kind: FieldKind,
    /// Number of values the field accepts.
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Remote field type (e.g. `string`, `entity_reference`, `text_long`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    /// Id of the pathbuilder path declaring the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<String>,
}

impl Path {
    /// Creates a leaf field path with cardinality `Many`.
    pub fn leaf(id: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bundle_id: bundle_id.into(),
            kind: FieldKind::Leaf,
            cardinality: Cardinality::Many,
            field_type: None,
            path_id: None,
        }
    }

    /// Creates a bundle field path pointing at `target_bundle`.
    pub fn bundle(
        id: impl Into<String>,
        bundle_id: impl Into<String>,
        target_bundle: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            bundle_id: bundle_id.into(),
            kind: FieldKind::Bundle(target_bundle.into()),
            cardinality: Cardinality::Many,
            field_type: None,
            path_id: None,
        }
    }

    /// Restricts the field to a single value.
    pub fn single(mut self) -> Self {
        self.cardinality = Cardinality::One;
        self
    }

    /// Allows any number of values.
    pub fn allow_many(mut self) -> Self {
        self.cardinality = Cardinality::Many;
        self
    }

    /// Sets the remote field type.
    pub fn with_field_type(mut self, field_type: &str) -> Self {
        self.field_type = Some(field_type.to_string());
        self
    }

    /// Sets the pathbuilder path id.
    pub fn with_path_id(mut self, path_id: &str) -> Self {
        self.path_id = Some(path_id.to_string());
        self
    }

    /// Returns `true` for fields holding nested entities.
    pub fn is_bundle_field(&self) -> bool {
        matches!(self.kind, FieldKind::Bundle(_))
    }

    /// Returns the nested bundle for bundle fields.
    pub fn target_bundle(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Bundle(target) => Some(target),
            FieldKind::Leaf => None,
        }
    }
}

/// A field of the merged schema.
///
/// Same shape as [`Path`] plus `parent_bundle_id`, the bundle enclosing the
/// owning bundle (`None` when the owner is a top-level bundle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Field id.
    pub id: String,
    /// Bundle owning this field.
    pub bundle_id: String,
    /// Bundle enclosing `bundle_id`.
    pub parent_bundle_id: Option<String>,
    /// Leaf or bundle field.
    pub kind: FieldKind,
    /// Number of values the field accepts.
    pub cardinality: Cardinality,
    /// Remote field type.
    pub field_type: Option<String>,
    /// Pathbuilder path id, when known.
    pub path_id: Option<String>,
}

impl SchemaNode {
    pub(crate) fn from_path(path: &Path) -> Self {
        Self {
            id: path.id.clone(),
            bundle_id: path.bundle_id.clone(),
            parent_bundle_id: None,
            kind: path.kind.clone(),
            cardinality: path.cardinality,
            field_type: path.field_type.clone(),
            path_id: path.path_id.clone(),
        }
    }

    /// Returns `true` for fields holding nested entities.
    pub fn is_bundle_field(&self) -> bool {
        matches!(self.kind, FieldKind::Bundle(_))
    }

    /// Returns the nested bundle for bundle fields.
    pub fn target_bundle(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Bundle(target) => Some(target),
            FieldKind::Leaf => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_serde_round_trip_keeps_kind() {
        let path = Path::bundle("production", "object", "production").single();
        let json = serde_json::to_string(&path).unwrap();
        let restored: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, path);
    }

    #[test]
    fn test_path_defaults_to_leaf_many() {
        let path: Path = serde_json::from_str(r#"{"id": "title", "bundle_id": "object"}"#).unwrap();
        assert_eq!(path.kind, FieldKind::Leaf);
        assert_eq!(path.cardinality, Cardinality::Many);
        assert!(path.field_type.is_none());
        assert!(path.path_id.is_none());
    }

    #[test]
    fn test_cardinality_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Cardinality::One).unwrap(), "\"one\"");
    }
}
