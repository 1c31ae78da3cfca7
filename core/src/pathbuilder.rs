//! Pathbuilders: one independently authored schema tree.
//!
//! The remote system ships each pathbuilder as a nested document where
//! groups (bundles) contain their field paths and nested groups. A
//! [`SchemaTree`] flattens that document into [`Path`]s, breadth-first, so
//! that every bundle is introduced before the bundles nested below it.

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{Cardinality, Path, SchemaError};

/// One pathbuilder: declared root bundles plus their field paths.
///
/// # Examples
///
/// ```
/// use wisski_core::{Path, SchemaTree};
///
/// let tree = SchemaTree::new("objects", vec![Path::leaf("title", "object")]);
/// assert_eq!(tree.id(), "objects");
/// assert_eq!(tree.paths().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTree {
    id: String,
    #[serde(default)]
    roots: Vec<String>,
    paths: Vec<Path>,
}

impl SchemaTree {
    /// Creates a pathbuilder from an explicit path list.
    ///
    /// Root bundles are the owning bundles that no path nests below another
    /// bundle.
    pub fn new(id: impl Into<String>, paths: Vec<Path>) -> Self {
        let mut roots: Vec<String> = Vec::new();
        for path in &paths {
            let nested = paths
                .iter()
                .any(|other| other.target_bundle() == Some(path.bundle_id.as_str()));
            if !nested && !roots.contains(&path.bundle_id) {
                roots.push(path.bundle_id.clone());
            }
        }
        Self {
            id: id.into(),
            roots,
            paths,
        }
    }

    /// Parses the remote's nested pathbuilder document.
    ///
    /// Top-level groups declare root bundles; nested groups become bundle
    /// fields of the enclosing bundle; other paths become its leaf fields.
    /// Disabled paths are skipped together with everything below them.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidPathbuilder`] if the document does not
    /// have the expected shape or declares a field outside any group.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use wisski_core::SchemaTree;
    ///
    /// let doc = json!({
    ///     "id": "objects",
    ///     "paths": {
    ///         "p_object": {
    ///             "id": "p_object", "field": "b_object", "bundle": "object",
    ///             "parent": "0", "is_group": "1", "enabled": "1",
    ///             "children": {
    ///                 "p_title": {
    ///                     "id": "p_title", "field": "f_title", "bundle": "object",
    ///                     "parent": "p_object", "is_group": "0", "enabled": "1",
    ///                     "fieldtype": "string", "cardinality": "-1", "children": []
    ///                 }
    ///             }
    ///         }
    ///     }
    /// });
    /// let tree = SchemaTree::from_pathbuilder_json(&doc).unwrap();
    /// assert_eq!(tree.roots(), ["object"]);
    /// assert_eq!(tree.paths()[0].id, "f_title");
    /// ```
    pub fn from_pathbuilder_json(document: &JsonValue) -> Result<Self, SchemaError> {
        let raw: RawPathbuilder = serde_json::from_value(document.clone()).map_err(|e| {
            SchemaError::InvalidPathbuilder {
                pathbuilder_id: document
                    .get("id")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("<unknown>")
                    .to_string(),
                details: e.to_string(),
            }
        })?;

        let mut roots = Vec::new();
        let mut paths = Vec::new();
        let mut queue: VecDeque<(&RawPath, Option<&str>)> =
            raw.paths.iter().map(|path| (path, None)).collect();

        while let Some((raw_path, enclosing)) = queue.pop_front() {
            if !raw_path.enabled {
                debug!(pathbuilder = %raw.id, path = %raw_path.id, "Skipping disabled path");
                continue;
            }

            match (raw_path.is_group, enclosing) {
                (true, None) => {
                    if !roots.contains(&raw_path.bundle) {
                        roots.push(raw_path.bundle.clone());
                    }
                }
                (true, Some(owner)) => {
                    let mut path = Path::bundle(&raw_path.field, owner, &raw_path.bundle)
                        .with_path_id(&raw_path.id);
                    path.cardinality = raw_path.cardinality;
                    paths.push(path);
                }
                (false, Some(owner)) => {
                    let mut path = Path::leaf(&raw_path.field, owner).with_path_id(&raw_path.id);
                    path.cardinality = raw_path.cardinality;
                    path.field_type = raw_path.field_type.clone();
                    paths.push(path);
                }
                (false, None) => {
                    return Err(SchemaError::InvalidPathbuilder {
                        pathbuilder_id: raw.id.clone(),
                        details: format!("field path {} is not inside a group", raw_path.id),
                    });
                }
            }

            if raw_path.is_group {
                for child in raw_path.children.iter() {
                    queue.push_back((child, Some(raw_path.bundle.as_str())));
                }
            }
        }

        debug!(
            pathbuilder = %raw.id,
            roots = roots.len(),
            paths = paths.len(),
            "Parsed pathbuilder"
        );
        Ok(Self {
            id: raw.id,
            roots,
            paths,
        })
    }

    /// Returns the pathbuilder id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the root bundles this pathbuilder declares.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Returns the flat path list.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }
}

impl AsRef<[Path]> for SchemaTree {
    fn as_ref(&self) -> &[Path] {
        &self.paths
    }
}

#[derive(Debug, Deserialize)]
struct RawPathbuilder {
    id: String,
    #[serde(default)]
    paths: RawChildren,
}

/// Child paths keyed by path id. Groups without children arrive as `[]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChildren {
    Keyed(IndexMap<String, RawPath>),
    Listed(Vec<RawPath>),
}

impl Default for RawChildren {
    fn default() -> Self {
        RawChildren::Listed(Vec::new())
    }
}

impl RawChildren {
    fn iter(&self) -> Box<dyn Iterator<Item = &RawPath> + '_> {
        match self {
            RawChildren::Keyed(map) => Box::new(map.values()),
            RawChildren::Listed(list) => Box::new(list.iter()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPath {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    field: String,
    bundle: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    is_group: bool,
    #[serde(default = "enabled_by_default", deserialize_with = "lenient_flag")]
    enabled: bool,
    #[serde(default, rename = "fieldtype")]
    field_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_cardinality")]
    cardinality: Cardinality,
    #[serde(default)]
    children: RawChildren,
}

fn enabled_by_default() -> bool {
    true
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    })
}

/// Accepts `true`/`false`, `1`/`0` and `"1"`/`"0"`.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Bool(b) => b,
        JsonValue::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        JsonValue::String(s) => matches!(s.trim(), "1" | "true"),
        _ => false,
    })
}

/// `1` means one value; `-1` (unlimited) and any larger bound mean many.
fn lenient_cardinality<'de, D>(deserializer: D) -> Result<Cardinality, D::Error>
where
    D: Deserializer<'de>,
{
    let bound = match JsonValue::deserialize(deserializer)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(match bound {
        Some(1) => Cardinality::One,
        _ => Cardinality::Many,
    })
}
