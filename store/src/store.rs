//! The file-store seam and its in-memory implementation.

use indexmap::IndexMap;

use crate::error::Result;
use crate::rows::{BundleRows, RowSet};

/// Reads and writes the rows of one bundle at a time.
///
/// Implementations decide where rows live; the codec only relies on
/// `read_rows` returning `None` for bundles that were never written.
pub trait FileStore {
    /// Reads the rows of a bundle, `None` if the store has none.
    fn read_rows(&self, bundle_id: &str) -> Result<Option<BundleRows>>;

    /// Replaces the rows of a bundle.
    fn write_rows(&mut self, bundle_id: &str, rows: &BundleRows) -> Result<()>;
}

/// A [`FileStore`] holding rows in memory.
///
/// # Examples
///
/// ```
/// use wisski_store::{BundleRows, FileStore, MemoryStore};
///
/// let mut store = MemoryStore::new();
/// let mut rows = BundleRows::new(["uri", "date"]);
/// rows.push_cells(["u2", "2020"]);
/// store.write_rows("production", &rows).unwrap();
///
/// assert_eq!(store.read_rows("production").unwrap(), Some(rows));
/// assert_eq!(store.read_rows("object").unwrap(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    bundles: IndexMap<String, BundleRows>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing row set.
    pub fn from_row_set(row_set: RowSet) -> Self {
        Self { bundles: row_set }
    }

    /// Returns the stored rows as a row set.
    pub fn row_set(&self) -> &RowSet {
        &self.bundles
    }

    /// Consumes the store, returning its rows.
    pub fn into_row_set(self) -> RowSet {
        self.bundles
    }
}

impl FileStore for MemoryStore {
    fn read_rows(&self, bundle_id: &str) -> Result<Option<BundleRows>> {
        Ok(self.bundles.get(bundle_id).cloned())
    }

    fn write_rows(&mut self, bundle_id: &str, rows: &BundleRows) -> Result<()> {
        self.bundles.insert(bundle_id.to_string(), rows.clone());
        Ok(())
    }
}
