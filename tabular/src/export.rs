//! Flattening entity trees into per-bundle rows.
//!
//! Every distinct entity becomes one row of its bundle: a `uri` cell
//! followed by one cell per schema field. Leaf cells join the literals with
//! the configured separator; bundle cells join the uris of the nested
//! entities, whose own rows land in the target bundle's collection.
//!
//! Column headers are field ids, or pathbuilder path ids under
//! [`KeyType::PathId`].
//!
//! Entities are deduplicated by `(bundle, uri)`, so a saved sub-entity that
//! appears under two parents yields one row. Bundles appear in the row set
//! in the order they are first reached, parents before their children.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use wisski_core::{Entity, MergedSchema, SchemaNode, validate_entity};
use wisski_store::{
    BundleRows, CodecConfig, FileStore, KeyType, Row, RowSet, URI_COLUMN, UnpersistedPolicy,
};

use crate::error::{Result, TabularError};

/// Exports one entity tree.
///
/// # Errors
///
/// Returns [`TabularError::Validation`] if the tree does not fit the schema,
/// [`TabularError::UnpersistedEntity`] for an entity without uri under
/// [`UnpersistedPolicy::Reject`], [`TabularError::ReservedUri`] for a saved
/// uri starting with the temporary prefix under
/// [`UnpersistedPolicy::Temporary`], [`TabularError::EmptyCell`] for a field
/// whose values join to an empty cell (such as a single empty literal), and
/// [`TabularError::Store`] for an unusable configuration.
///
/// # Examples
///
/// ```
/// use wisski_core::*;
/// use wisski_store::CodecConfig;
///
/// let schema = merge([vec![
///     Path::leaf("title", "object"),
///     Path::bundle("production", "object", "production").single(),
///     Path::leaf("date", "production").single(),
/// ]])
/// .unwrap();
///
/// let object = Entity::new("object")
///     .with_uri("u1")
///     .with("title", ["A", "B"])
///     .with(
///         "production",
///         [Entity::new("production").with_uri("u2").with("date", ["2020"])],
///     );
///
/// let rows = wisski_tabular::export(&object, &schema, &CodecConfig::default()).unwrap();
/// assert_eq!(rows["object"].cell(0, "title"), Some("A;B"));
/// assert_eq!(rows["object"].cell(0, "production"), Some("u2"));
/// assert_eq!(rows["production"].cell(0, "date"), Some("2020"));
/// ```
pub fn export(entity: &Entity, schema: &MergedSchema, config: &CodecConfig) -> Result<RowSet> {
    export_all([entity], schema, config)
}

/// Exports several entity trees into one row set.
///
/// Deduplication and temporary uri numbering span all trees.
pub fn export_all<'e, I>(
    entities: I,
    schema: &MergedSchema,
    config: &CodecConfig,
) -> Result<RowSet>
where
    I: IntoIterator<Item = &'e Entity>,
{
    config.validate()?;

    let mut exporter = Exporter {
        schema,
        config,
        rows: RowSet::new(),
        seen: HashSet::new(),
        temporary: 0,
    };
    let mut roots = 0;
    for entity in entities {
        validate_entity(entity, schema)?;
        exporter.visit(entity)?;
        roots += 1;
    }

    let rows = exporter.rows;
    info!(
        roots,
        bundles = rows.len(),
        rows = rows.values().map(BundleRows::len).sum::<usize>(),
        "Exported entities"
    );
    Ok(rows)
}

/// Exports entity trees and writes every bundle's rows to `store`.
///
/// Returns the rows that were written.
///
/// # Errors
///
/// Returns the errors of [`export_all`], and [`TabularError::Store`] when
/// writing fails. Bundles written before a failure stay written.
pub fn export_to_store<'e, I, S>(
    entities: I,
    schema: &MergedSchema,
    config: &CodecConfig,
    store: &mut S,
) -> Result<RowSet>
where
    I: IntoIterator<Item = &'e Entity>,
    S: FileStore + ?Sized,
{
    let rows = export_all(entities, schema, config)?;
    for (bundle_id, bundle_rows) in &rows {
        store.write_rows(bundle_id, bundle_rows)?;
    }
    Ok(rows)
}

struct Exporter<'a> {
    schema: &'a MergedSchema,
    config: &'a CodecConfig,
    rows: RowSet,
    seen: HashSet<(String, String)>,
    temporary: usize,
}

impl Exporter<'_> {
    /// Emits the rows of `entity` and everything below it, returning the uri
    /// the parent cell should reference.
    fn visit(&mut self, entity: &Entity) -> Result<String> {
        let schema = self.schema;
        let bundle_id = entity.bundle_id();
        let uri = match entity.uri() {
            Some(uri) => self.saved_uri(bundle_id, uri)?,
            None => self.temporary_uri(bundle_id)?,
        };

        if !self.seen.insert((bundle_id.to_string(), uri.clone())) {
            debug!(bundle = %bundle_id, uri = %uri, "Entity already exported");
            return Ok(uri);
        }

        // Reserve the bundle's slot before the children claim theirs.
        self.bundle_rows(bundle_id);

        let mut row = Row::new();
        row.insert(URI_COLUMN.to_string(), uri.clone());
        for node in schema.fields_of(bundle_id) {
            let cells = if node.is_bundle_field() {
                entity
                    .entities(&node.id)
                    .map(|child| self.visit(child))
                    .collect::<Result<Vec<_>>>()?
            } else {
                entity
                    .literals(&node.id)
                    .map(|literal| {
                        if literal.contains(self.config.separator.as_str()) {
                            warn!(
                                bundle = %bundle_id,
                                field = %node.id,
                                uri = %uri,
                                "Literal contains the value separator and will split on import"
                            );
                        }
                        literal.to_string()
                    })
                    .collect()
            };

            let cell = cells.join(self.config.separator.as_str());
            if cell.is_empty() && !cells.is_empty() {
                return Err(TabularError::EmptyCell {
                    bundle_id: bundle_id.to_string(),
                    field_id: node.id.clone(),
                    uri,
                });
            }
            row.insert(column_name(node, self.config.key_type).to_string(), cell);
        }

        self.bundle_rows(bundle_id).push(row);
        Ok(uri)
    }

    fn bundle_rows(&mut self, bundle_id: &str) -> &mut BundleRows {
        let schema = self.schema;
        let key_type = self.config.key_type;
        self.rows
            .entry(bundle_id.to_string())
            .or_insert_with(|| {
                BundleRows::new(
                    std::iter::once(URI_COLUMN).chain(
                        schema
                            .fields_of(bundle_id)
                            .map(|node| column_name(node, key_type)),
                    ),
                )
            })
    }

    fn saved_uri(&self, bundle_id: &str, uri: &str) -> Result<String> {
        let config = self.config;
        if config.unpersisted == UnpersistedPolicy::Temporary
            && uri.starts_with(config.temporary_prefix.as_str())
        {
            return Err(TabularError::ReservedUri {
                bundle_id: bundle_id.to_string(),
                uri: uri.to_string(),
            });
        }
        Ok(uri.to_string())
    }

    fn temporary_uri(&mut self, bundle_id: &str) -> Result<String> {
        match self.config.unpersisted {
            UnpersistedPolicy::Reject => Err(TabularError::UnpersistedEntity {
                bundle_id: bundle_id.to_string(),
            }),
            UnpersistedPolicy::Temporary => {
                self.temporary += 1;
                let uri = format!("{}{}", self.config.temporary_prefix, self.temporary);
                debug!(bundle = %bundle_id, uri = %uri, "Assigned temporary uri");
                Ok(uri)
            }
        }
    }
}

fn column_name(node: &SchemaNode, key_type: KeyType) -> &str {
    match key_type {
        KeyType::FieldId => &node.id,
        KeyType::PathId => node.path_id.as_deref().unwrap_or(&node.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisski_core::{Path, merge};

    fn schema() -> MergedSchema {
        merge([vec![
            Path::leaf("title", "object"),
            Path::bundle("production", "object", "production"),
            Path::leaf("date", "production").single(),
        ]])
        .unwrap()
    }

    fn production(uri: &str, date: &str) -> Entity {
        Entity::new("production").with_uri(uri).with("date", [date])
    }

    #[test]
    fn test_export_columns_follow_schema_order() {
        let object = Entity::new("object")
            .with_uri("u1")
            .with("production", [production("u2", "2020")])
            .with("title", ["A"]);
        let rows = export(&object, &schema(), &CodecConfig::default()).unwrap();
        assert_eq!(rows["object"].columns(), ["uri", "title", "production"]);
        assert_eq!(rows.keys().collect::<Vec<_>>(), ["object", "production"]);
    }

    #[test]
    fn test_export_empty_fields_become_empty_cells() {
        let object = Entity::new("object").with_uri("u1");
        let rows = export(&object, &schema(), &CodecConfig::default()).unwrap();
        assert_eq!(rows["object"].cell(0, "title"), Some(""));
        assert_eq!(rows["object"].cell(0, "production"), Some(""));
        assert!(!rows.contains_key("production"));
    }

    #[test]
    fn test_export_deduplicates_shared_sub_entity() {
        let shared = production("u2", "2020");
        let first = Entity::new("object")
            .with_uri("u1")
            .with("production", [shared.clone()]);
        let second = Entity::new("object")
            .with_uri("u3")
            .with("production", [shared]);

        let rows = export_all([&first, &second], &schema(), &CodecConfig::default()).unwrap();
        assert_eq!(rows["object"].len(), 2);
        assert_eq!(rows["production"].len(), 1);
    }

    #[test]
    fn test_export_rejects_unsaved_entity() {
        let object = Entity::new("object")
            .with_uri("u1")
            .with("production", [Entity::new("production").with("date", ["2020"])]);
        let err = export(&object, &schema(), &CodecConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            TabularError::UnpersistedEntity { ref bundle_id } if bundle_id == "production"
        ));
    }

    #[test]
    fn test_export_assigns_temporary_uris() {
        let config = CodecConfig {
            unpersisted: UnpersistedPolicy::Temporary,
            ..CodecConfig::default()
        };
        let object = Entity::new("object").with(
            "production",
            [
                Entity::new("production").with("date", ["2020"]),
                Entity::new("production").with("date", ["2021"]),
            ],
        );

        let rows = export(&object, &schema(), &config).unwrap();
        assert_eq!(rows["object"].cell(0, "uri"), Some("_:new1"));
        assert_eq!(rows["object"].cell(0, "production"), Some("_:new2;_:new3"));
        assert_eq!(rows["production"].cell(1, "uri"), Some("_:new3"));
    }

    #[test]
    fn test_export_validates_tree() {
        let object = Entity::new("object").with_uri("u1").with("date", ["2020"]);
        assert!(matches!(
            export(&object, &schema(), &CodecConfig::default()),
            Err(TabularError::Validation(_))
        ));
    }

    #[test]
    fn test_export_rejects_single_empty_literal() {
        let object = Entity::new("object").with_uri("u1").with("title", [""]);
        match export(&object, &schema(), &CodecConfig::default()) {
            Err(TabularError::EmptyCell {
                bundle_id,
                field_id,
                uri,
            }) => {
                assert_eq!(bundle_id, "object");
                assert_eq!(field_id, "title");
                assert_eq!(uri, "u1");
            }
            other => panic!("expected empty cell error, got {other:?}"),
        }
    }

    #[test]
    fn test_export_keeps_empty_literal_among_others() {
        let object = Entity::new("object").with_uri("u1").with("title", ["", "A"]);
        let rows = export(&object, &schema(), &CodecConfig::default()).unwrap();
        assert_eq!(rows["object"].cell(0, "title"), Some(";A"));
    }

    #[test]
    fn test_export_prefixed_uri_is_plain_under_reject() {
        let object = Entity::new("object").with_uri("_:new-blank");
        let rows = export(&object, &schema(), &CodecConfig::default()).unwrap();
        assert_eq!(rows["object"].cell(0, "uri"), Some("_:new-blank"));
    }

    #[test]
    fn test_export_rejects_prefixed_uri_under_temporary() {
        let config = CodecConfig {
            unpersisted: UnpersistedPolicy::Temporary,
            ..CodecConfig::default()
        };
        let object = Entity::new("object")
            .with_uri("u1")
            .with("production", [production("_:new-blank", "2020")]);
        assert!(matches!(
            export(&object, &schema(), &config),
            Err(TabularError::ReservedUri { ref bundle_id, ref uri })
                if bundle_id == "production" && uri == "_:new-blank"
        ));
    }

    #[test]
    fn test_export_path_id_headers() {
        let schema = merge([vec![
            Path::leaf("title", "object").with_path_id("p_title"),
            Path::leaf("inventory", "object"),
        ]])
        .unwrap();
        let config = CodecConfig {
            key_type: KeyType::PathId,
            ..CodecConfig::default()
        };
        let object = Entity::new("object")
            .with_uri("u1")
            .with("title", ["A"])
            .with("inventory", ["MH-670"]);

        let rows = export(&object, &schema, &config).unwrap();
        assert_eq!(rows["object"].columns(), ["uri", "p_title", "inventory"]);
        assert_eq!(rows["object"].cell(0, "p_title"), Some("A"));
    }
}
