//! Row storage for tabular WissKI exports.
//!
//! An exported entity tree becomes one row collection per bundle. This crate
//! holds those collections and moves them in and out of files:
//!
//! - [`BundleRows`] / [`RowSet`]: ordered columns and string cells per bundle.
//! - [`FileStore`]: the read/write seam the codec talks to.
//! - [`MemoryStore`]: rows kept in memory.
//! - [`CsvDirectory`]: one `{bundle_id}.csv` file per bundle.
//! - [`CodecConfig`]: YAML-loadable separator, delimiter and
//!   unpersisted-entity policy.
//!
//! # Quick start
//!
//! ```no_run
//! use wisski_store::{BundleRows, CodecConfig, CsvDirectory, FileStore};
//!
//! let config = CodecConfig::load("codec.yml").unwrap();
//! let mut store = CsvDirectory::with_config("exports/", &config).unwrap();
//!
//! let mut rows = BundleRows::new(["uri", "title"]);
//! rows.push_cells(["u1", "A;B"]);
//! store.write_rows("object", &rows).unwrap();
//!
//! let back = store.read_rows("object").unwrap().unwrap();
//! assert_eq!(back.cell(0, "title"), Some("A;B"));
//! ```

mod config;
mod directory;
mod error;
mod rows;
mod store;

pub use config::{CodecConfig, KeyType, UnpersistedPolicy};
pub use directory::CsvDirectory;
pub use error::{Result, StoreError};
pub use rows::{BundleRows, Row, RowSet, URI_COLUMN};
pub use store::{FileStore, MemoryStore};
