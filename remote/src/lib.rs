//! Remote mapping for WissKI entity trees.
//!
//! A [`RemoteMapper`] connects to a WissKI instance through a [`Transport`],
//! merges the instance's pathbuilders into one schema, and loads or saves
//! entity trees as nested JSON payloads ([`to_payload`] / [`from_payload`]).
//!
//! Saving works bottom-up: every nested entity is created or updated before
//! its parent, so a new tree comes back with a uri on every node. The
//! transport is the only component that performs I/O; this crate never
//! retries, but [`TransportError::is_retryable`] tells callers which
//! failures are worth repeating.
//!
//! # Quick start
//!
//! ```no_run
//! # use serde_json::Value as JsonValue;
//! # use wisski_core::SchemaTree;
//! # use wisski_remote::{Transport, TransportError};
//! # struct Http;
//! # impl Transport for Http {
//! #     fn list_pathbuilders(&mut self) -> Result<Vec<String>, TransportError> { todo!() }
//! #     fn fetch_paths(&mut self, _: &str) -> Result<SchemaTree, TransportError> { todo!() }
//! #     fn fetch_entity(&mut self, _: &str) -> Result<JsonValue, TransportError> { todo!() }
//! #     fn create_or_update_entity(
//! #         &mut self,
//! #         _: &str,
//! #         _: &JsonValue,
//! #     ) -> Result<JsonValue, TransportError> {
//! #         todo!()
//! #     }
//! # }
//! use wisski_core::Entity;
//! use wisski_remote::RemoteMapper;
//!
//! let mut mapper = RemoteMapper::connect_all(Http).unwrap();
//!
//! let object = Entity::new("object")
//!     .with("title", ["A"])
//!     .with("production", [Entity::new("production").with("date", ["2020"])]);
//! let saved = mapper.save(&object).unwrap();
//! assert!(saved.all_persisted());
//!
//! let reloaded = mapper.load(saved.uri().unwrap()).unwrap();
//! ```

mod error;
mod mapper;
mod payload;
mod transport;

pub use error::{PayloadError, RemoteError, Result};
pub use mapper::RemoteMapper;
pub use payload::{from_payload, to_payload};
pub use transport::{Transport, TransportError};
