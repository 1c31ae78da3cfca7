//! Row collections: the tabular side of an entity export.
//!
//! A [`RowSet`] maps each bundle id to its [`BundleRows`]: an ordered column
//! list (`uri` first) and rows keyed by column name. Cells are plain strings;
//! multi-valued cells are joined by the codec, not here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the primary-key column present in every bundle file.
pub const URI_COLUMN: &str = "uri";

/// One row: column name → cell.
pub type Row = IndexMap<String, String>;

/// All bundles of an export: bundle id → rows.
pub type RowSet = IndexMap<String, BundleRows>;

/// The rows of one bundle with their column order.
///
/// # Examples
///
/// ```
/// use wisski_store::BundleRows;
///
/// let mut rows = BundleRows::new(["uri", "date"]);
/// rows.push_cells(["u2", "2020"]);
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows.cell(0, "date"), Some("2020"));
/// assert_eq!(rows.find_by_uri("u2").count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRows {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl BundleRows {
    /// Creates an empty collection with the given column order.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Returns the column order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row. Columns the row uses but the collection lacks are
    /// added at the end.
    pub fn push(&mut self, row: Row) {
        for column in row.keys() {
            if !self.columns.contains(column) {
                self.columns.push(column.clone());
            }
        }
        self.rows.push(row);
    }

    /// Appends a row given as cells in column order. Missing trailing cells
    /// are left empty; surplus cells are dropped.
    pub fn push_cells<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells = cells.into_iter();
        let row = self
            .columns
            .iter()
            .map(|column| {
                let cell = cells.next().map(Into::into).unwrap_or_default();
                (column.clone(), cell)
            })
            .collect();
        self.rows.push(row);
    }

    /// Returns a cell, `None` if the row or column does not exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|row| row.get(column))
            .map(String::as_str)
    }

    /// Returns the rows whose `uri` cell equals `uri`.
    pub fn find_by_uri<'a>(&'a self, uri: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows
            .iter()
            .filter(move |row| row.get(URI_COLUMN).is_some_and(|cell| cell == uri))
    }

    /// Renames a column in the column order and in every row, keeping its
    /// position.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        for column in &mut self.columns {
            if *column == from {
                *column = to.to_string();
            }
        }
        for row in &mut self.rows {
            if row.contains_key(from) {
                *row = row
                    .drain(..)
                    .map(|(column, cell)| {
                        if column == from {
                            (to.to_string(), cell)
                        } else {
                            (column, cell)
                        }
                    })
                    .collect();
            }
        }
    }

    /// Returns `true` if the collection has a `uri` column.
    pub fn has_uri_column(&self) -> bool {
        self.columns.iter().any(|c| c == URI_COLUMN)
    }
}
