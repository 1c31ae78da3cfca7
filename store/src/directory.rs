//! CSV files in a directory, one per bundle.
//!
//! Bundle `b` lives in `<root>/b.csv`. The first record is the header (`uri`
//! followed by field ids); every further record is one row. Writing a
//! bundle replaces its file.
//!
//! ```no_run
//! use wisski_store::{CsvDirectory, FileStore};
//!
//! let store = CsvDirectory::new("exports/");
//! if let Some(rows) = store.read_rows("object").unwrap() {
//!     println!("{} objects", rows.len());
//! }
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::CodecConfig;
use crate::error::{Result, StoreError};
use crate::rows::{BundleRows, Row};
use crate::store::FileStore;

/// A [`FileStore`] backed by `{bundle_id}.csv` files.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
    delimiter: u8,
}

impl CsvDirectory {
    /// Creates a store rooted at `root` using `,` as delimiter.
    ///
    /// The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            delimiter: b',',
        }
    }

    /// Creates a store using the delimiter from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the configured delimiter is
    /// not a single-byte character.
    pub fn with_config(root: impl Into<PathBuf>, config: &CodecConfig) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            delimiter: config.delimiter_byte()?,
        })
    }

    /// Returns the directory holding the files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path used for a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidBundleId`] for ids that are empty or
    /// contain path separators.
    pub fn path_for(&self, bundle_id: &str) -> Result<PathBuf> {
        if bundle_id.is_empty()
            || bundle_id == "."
            || bundle_id == ".."
            || bundle_id.contains(['/', '\\'])
        {
            return Err(StoreError::InvalidBundleId(bundle_id.to_string()));
        }
        Ok(self.root.join(format!("{bundle_id}.csv")))
    }
}

impl FileStore for CsvDirectory {
    fn read_rows(&self, bundle_id: &str) -> Result<Option<BundleRows>> {
        let path = self.path_for(bundle_id)?;
        if !path.is_file() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(&path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if columns.is_empty() {
            return Err(StoreError::MalformedFile {
                bundle_id: bundle_id.to_string(),
                details: "missing header row".to_string(),
            });
        }

        let mut rows = BundleRows::new(columns.iter().cloned());
        for record in reader.records() {
            let record = record?;
            let row: Row = columns
                .iter()
                .cloned()
                .zip(record.iter().map(String::from))
                .collect();
            rows.push(row);
        }

        debug!(bundle = %bundle_id, path = %path.display(), rows = rows.len(), "Read bundle rows");
        Ok(Some(rows))
    }

    fn write_rows(&mut self, bundle_id: &str, rows: &BundleRows) -> Result<()> {
        let path = self.path_for(bundle_id)?;
        std::fs::create_dir_all(&self.root)?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&path)?;
        writer.write_record(rows.columns())?;
        for row in rows.rows() {
            writer.write_record(
                rows.columns()
                    .iter()
                    .map(|column| row.get(column).map(String::as_str).unwrap_or("")),
            )?;
        }
        writer.flush()?;

        debug!(bundle = %bundle_id, path = %path.display(), rows = rows.len(), "Wrote bundle rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for_uses_bundle_id_as_file_name() {
        let store = CsvDirectory::new("/tmp/exports");
        assert_eq!(
            store.path_for("object").unwrap(),
            PathBuf::from("/tmp/exports/object.csv")
        );
    }

    #[test]
    fn test_path_for_rejects_separators() {
        let store = CsvDirectory::new("/tmp/exports");
        assert!(matches!(
            store.path_for("../object"),
            Err(StoreError::InvalidBundleId(_))
        ));
        assert!(store.path_for("").is_err());
    }
}
