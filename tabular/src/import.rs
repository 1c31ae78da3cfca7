//! Rebuilding entity trees from per-bundle rows.
//!
//! Each row of the root bundle becomes one entity. Bundle cells are split
//! into uris, and every uri is looked up by the `uri` column of the target
//! bundle's rows and built recursively. Recursion follows the schema, which
//! is acyclic, so no cycle guard is needed.
//!
//! Failures are isolated per root row: a dangling reference fails the row
//! that holds it and nothing else. Sub-entities are memoized by
//! `(bundle, uri)` within one call; every parent receives its own copy.

use std::borrow::Cow;
use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{info, warn};
use wisski_core::{Entity, MergedSchema, Value};
use wisski_store::{
    BundleRows, CodecConfig, FileStore, KeyType, Row, RowSet, URI_COLUMN, UnpersistedPolicy,
};

use crate::error::{Result, TabularError};

/// Imports every row of `root_bundle_id` as an entity tree.
///
/// The outer result fails for problems affecting the whole call; the inner
/// results hold one entry per root row, in row order. Empty cells carry no
/// values, and empty parts of a bundle cell reference nothing. Rows with an
/// empty uri import as unsaved entities, as do rows whose uri carries the
/// temporary prefix under [`UnpersistedPolicy::Temporary`]. Under
/// [`KeyType::PathId`] column headers naming a known path id are read as
/// the field it declares.
///
/// # Errors
///
/// The outer result is [`TabularError::UnknownBundle`] if the root bundle is
/// not in the schema, [`TabularError::MissingRows`] if the row set has no
/// rows for it, and [`TabularError::UnknownColumn`] or
/// [`TabularError::MissingUriColumn`] if a collection in the root's subtree
/// does not match its bundle. Inner results carry
/// [`TabularError::UnresolvedReference`],
/// [`TabularError::AmbiguousReference`] and [`TabularError::Validation`].
///
/// # Examples
///
/// ```
/// use wisski_core::*;
/// use wisski_store::{BundleRows, CodecConfig, RowSet};
///
/// let schema = merge([vec![
///     Path::leaf("title", "object"),
///     Path::bundle("production", "object", "production").single(),
///     Path::leaf("date", "production").single(),
/// ]])
/// .unwrap();
///
/// let mut objects = BundleRows::new(["uri", "title", "production"]);
/// objects.push_cells(["u1", "A;B", "u2"]);
/// let mut productions = BundleRows::new(["uri", "date"]);
/// productions.push_cells(["u2", "2020"]);
///
/// let mut rows = RowSet::new();
/// rows.insert("object".to_string(), objects);
/// rows.insert("production".to_string(), productions);
///
/// let imported =
///     wisski_tabular::import("object", &rows, &schema, &CodecConfig::default()).unwrap();
/// let object = imported[0].as_ref().unwrap();
/// assert_eq!(object.literals("title").collect::<Vec<_>>(), ["A", "B"]);
/// assert_eq!(object.entities("production").next().unwrap().uri(), Some("u2"));
/// ```
pub fn import(
    root_bundle_id: &str,
    row_set: &RowSet,
    schema: &MergedSchema,
    config: &CodecConfig,
) -> Result<Vec<Result<Entity>>> {
    config.validate()?;
    if !schema.contains_bundle(root_bundle_id) {
        return Err(TabularError::UnknownBundle(root_bundle_id.to_string()));
    }

    let row_set = field_keyed(row_set, schema, config.key_type);
    let row_set: &RowSet = &row_set;
    for bundle_id in schema.subtree_bundles(root_bundle_id) {
        if let Some(rows) = row_set.get(&bundle_id) {
            check_columns(&bundle_id, rows, schema)?;
        }
    }

    let root_rows = row_set
        .get(root_bundle_id)
        .ok_or_else(|| TabularError::MissingRows(root_bundle_id.to_string()))?;

    let mut importer = Importer {
        row_set,
        schema,
        config,
        memo: HashMap::new(),
    };
    let results: Vec<_> = root_rows
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let result = importer.build(root_bundle_id, row);
            if let Err(err) = &result {
                warn!(
                    bundle = %root_bundle_id,
                    row = index,
                    error = %err,
                    "Failed to import row"
                );
            }
            result
        })
        .collect();

    info!(
        bundle = %root_bundle_id,
        imported = results.iter().filter(|r| r.is_ok()).count(),
        failed = results.iter().filter(|r| r.is_err()).count(),
        "Imported entities"
    );
    Ok(results)
}

/// Reads the root bundle and every bundle below it from `store`, then
/// imports.
///
/// Bundles the store has no rows for are treated as empty.
///
/// # Errors
///
/// Returns [`TabularError::Store`] when reading fails, and otherwise the
/// errors of [`import`].
pub fn import_from_store<S>(
    root_bundle_id: &str,
    store: &S,
    schema: &MergedSchema,
    config: &CodecConfig,
) -> Result<Vec<Result<Entity>>>
where
    S: FileStore + ?Sized,
{
    let mut row_set = RowSet::new();
    for bundle_id in schema.subtree_bundles(root_bundle_id) {
        if let Some(rows) = store.read_rows(&bundle_id)? {
            row_set.insert(bundle_id, rows);
        }
    }
    import(root_bundle_id, &row_set, schema, config)
}

/// Renames path-id headers to the field ids they declare.
fn field_keyed<'r>(
    row_set: &'r RowSet,
    schema: &MergedSchema,
    key_type: KeyType,
) -> Cow<'r, RowSet> {
    if key_type == KeyType::FieldId {
        return Cow::Borrowed(row_set);
    }
    let mut renamed = row_set.clone();
    for rows in renamed.values_mut() {
        let columns = rows.columns().to_vec();
        for column in columns {
            if let Some(field_id) = schema.field_for_path(&column) {
                rows.rename_column(&column, field_id);
            }
        }
    }
    Cow::Owned(renamed)
}

fn check_columns(bundle_id: &str, rows: &BundleRows, schema: &MergedSchema) -> Result<()> {
    if !rows.has_uri_column() {
        return Err(TabularError::MissingUriColumn(bundle_id.to_string()));
    }
    let fields = schema.bundle_fields(bundle_id);
    for column in rows.columns() {
        if column != URI_COLUMN && !fields.contains(column) {
            return Err(TabularError::UnknownColumn {
                bundle_id: bundle_id.to_string(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}

struct Importer<'a> {
    row_set: &'a RowSet,
    schema: &'a MergedSchema,
    config: &'a CodecConfig,
    memo: HashMap<(String, String), Entity>,
}

impl Importer<'_> {
    fn build(&mut self, bundle_id: &str, row: &Row) -> Result<Entity> {
        let schema = self.schema;
        let config = self.config;

        let temporary = |uri: &str| {
            config.unpersisted == UnpersistedPolicy::Temporary
                && uri.starts_with(config.temporary_prefix.as_str())
        };
        let uri = row
            .get(URI_COLUMN)
            .filter(|uri| !uri.is_empty() && !temporary(uri.as_str()))
            .cloned();

        let mut fields = IndexMap::new();
        for node in schema.fields_of(bundle_id) {
            let Some(cell) = row.get(&node.id).filter(|cell| !cell.is_empty()) else {
                continue;
            };
            let parts = cell.split(config.separator.as_str());
            let values = match node.target_bundle() {
                None => parts.map(Value::from).collect(),
                Some(target) => parts
                    .filter(|reference| !reference.is_empty())
                    .map(|reference| self.resolve(target, reference).map(Value::Entity))
                    .collect::<Result<Vec<_>>>()?,
            };
            fields.insert(node.id.clone(), values);
        }

        Ok(Entity::from_fields(bundle_id, uri, fields, schema)?)
    }

    fn resolve(&mut self, bundle_id: &str, uri: &str) -> Result<Entity> {
        let key = (bundle_id.to_string(), uri.to_string());
        if let Some(entity) = self.memo.get(&key) {
            return Ok(entity.clone());
        }

        let row_set = self.row_set;
        let mut matches = row_set
            .get(bundle_id)
            .into_iter()
            .flat_map(|rows| rows.find_by_uri(uri));
        let row = match (matches.next(), matches.next()) {
            (Some(row), None) => row,
            (None, _) => {
                return Err(TabularError::UnresolvedReference {
                    bundle_id: bundle_id.to_string(),
                    uri: uri.to_string(),
                });
            }
            (Some(_), Some(_)) => {
                return Err(TabularError::AmbiguousReference {
                    bundle_id: bundle_id.to_string(),
                    uri: uri.to_string(),
                    count: 2 + matches.count(),
                });
            }
        };

        let entity = self.build(bundle_id, row)?;
        self.memo.insert(key, entity.clone());
        Ok(entity)
    }
}
