//! Error types for tabular export and import.
//!
//! Provides a unified error type covering entities that cannot be written
//! faithfully, unresolved or ambiguous URI references, malformed row sets,
//! entity validation and store failures.

use thiserror::Error;
use wisski_core::ValidationError;
use wisski_store::StoreError;

/// Errors that can occur while converting between entities and rows.
#[derive(Debug, Error)]
pub enum TabularError {
    /// An entity without uri was exported under the reject policy.
    #[error("cannot export unsaved entity of bundle {bundle_id}")]
    UnpersistedEntity {
        /// Bundle of the unsaved entity.
        bundle_id: String,
    },

    /// A field holds values that would be written as an empty cell, which
    /// reads back as no values at all.
    #[error("field {field_id} of {bundle_id} entity {uri} would export as an empty cell")]
    EmptyCell {
        /// Bundle of the entity.
        bundle_id: String,
        /// The field whose values vanish.
        field_id: String,
        /// Uri of the entity.
        uri: String,
    },

    /// A saved entity's uri starts with the temporary uri prefix.
    #[error("uri {uri} of bundle {bundle_id} collides with the temporary uri prefix")]
    ReservedUri {
        /// Bundle of the entity.
        bundle_id: String,
        /// The colliding uri.
        uri: String,
    },

    /// A bundle cell names a uri with no row in the referenced bundle.
    #[error("unresolved reference to {uri} in bundle {bundle_id}")]
    UnresolvedReference {
        /// Bundle that should hold the row.
        bundle_id: String,
        /// The dangling uri.
        uri: String,
    },

    /// A bundle cell names a uri that matches several rows.
    #[error("reference to {uri} matches {count} rows in bundle {bundle_id}")]
    AmbiguousReference {
        /// Bundle holding the duplicate rows.
        bundle_id: String,
        /// The duplicated uri.
        uri: String,
        /// Number of matching rows.
        count: usize,
    },

    /// The requested root bundle is not part of the schema.
    #[error("unknown bundle: {0}")]
    UnknownBundle(String),

    /// The row set has no rows for the root bundle.
    #[error("no rows for root bundle {0}")]
    MissingRows(String),

    /// A row collection has a column that is not a field of its bundle.
    #[error("unknown column {column} in bundle {bundle_id}")]
    UnknownColumn {
        /// Bundle of the row collection.
        bundle_id: String,
        /// The unexpected column.
        column: String,
    },

    /// A row collection lacks the `uri` column.
    #[error("bundle {0} has no uri column")]
    MissingUriColumn(String),

    /// The entity tree does not fit the schema.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reading or writing rows failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for results with [`TabularError`].
pub type Result<T> = std::result::Result<T, TabularError>;
