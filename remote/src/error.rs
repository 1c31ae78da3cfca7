//! Error types for remote mapping.
//!
//! [`PayloadError`] covers nested payloads that cannot be read as entities;
//! [`RemoteError`] wraps everything the mapper can fail with, including the
//! per-node [`RemoteError::Save`] that names the entity whose save failed.

use thiserror::Error;
use wisski_core::{SchemaError, ValidationError};

use crate::transport::TransportError;

/// A nested payload that cannot be read as an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The payload is not a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// The payload names no bundle.
    #[error("payload has no bundle target_id")]
    MissingBundle,

    /// A field does not hold a list of value objects.
    #[error("field {field_id} is malformed: {details}")]
    MalformedField {
        /// The offending field.
        field_id: String,
        /// What is wrong with it.
        details: String,
    },
}

/// Errors that can occur while loading or saving entities remotely.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Saving one node of a tree failed. Nodes saved before it stay saved.
    #[error("failed to save {bundle_id} entity {uri}: {source}")]
    Save {
        /// Bundle of the failing node.
        bundle_id: String,
        /// Uri of the failing node, `new` if it had none.
        uri: String,
        /// Why the save failed.
        #[source]
        source: Box<RemoteError>,
    },

    /// The remote accepted an entity but returned no uri for it.
    #[error("remote returned no uri for {bundle_id} entity")]
    MissingUri {
        /// Bundle of the saved entity.
        bundle_id: String,
    },

    /// A payload could not be read.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// An entity does not fit the schema.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The remote's pathbuilders cannot be merged.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl RemoteError {
    /// Returns the underlying cause, looking through [`RemoteError::Save`].
    pub fn root_cause(&self) -> &RemoteError {
        match self {
            RemoteError::Save { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience alias for results with [`RemoteError`].
pub type Result<T> = std::result::Result<T, RemoteError>;
