//! Tabular codec for WissKI entity trees.
//!
//! This crate converts entity trees to per-bundle row collections and back.
//! Rows of different bundles are linked by uri: a bundle-field cell holds
//! the `;`-joined uris of the nested entities, each of which has its own row
//! in the target bundle's collection.
//!
//! # Architecture
//!
//! - **`export`**: tree → rows, deduplicated by `(bundle, uri)`, with a
//!   configurable policy for entities that have no uri yet.
//! - **`import`**: rows → trees, resolving uri references per root row
//!   with per-call memoization.
//!
//! Both directions also exist against a [`FileStore`](wisski_store::FileStore)
//! ([`export_to_store`], [`import_from_store`]), which is how CSV files are
//! written and read.
//!
//! # Quick start
//!
//! ```no_run
//! use wisski_core::{Entity, Path, merge};
//! use wisski_store::{CodecConfig, CsvDirectory};
//!
//! let schema = merge([vec![
//!     Path::leaf("title", "object"),
//!     Path::bundle("production", "object", "production").single(),
//!     Path::leaf("date", "production").single(),
//! ]])
//! .unwrap();
//! let config = CodecConfig::default();
//! let mut store = CsvDirectory::new("exports/");
//!
//! let object = Entity::new("object")
//!     .with_uri("u1")
//!     .with("title", ["A", "B"])
//!     .with("production", [Entity::new("production").with_uri("u2").with("date", ["2020"])]);
//! wisski_tabular::export_to_store([&object], &schema, &config, &mut store).unwrap();
//!
//! for result in wisski_tabular::import_from_store("object", &store, &schema, &config).unwrap() {
//!     match result {
//!         Ok(entity) => println!("imported {:?}", entity.uri()),
//!         Err(err) => eprintln!("skipped row: {err}"),
//!     }
//! }
//! ```
//!
//! # Limitations
//!
//! The value separator is not escaped. A literal containing it splits into
//! several values on import; export logs a warning when that happens.

mod error;
mod export;
mod import;

pub use error::{Result, TabularError};
pub use export::{export, export_all, export_to_store};
pub use import::{import, import_from_store};
