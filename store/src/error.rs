//! Error types for row store operations.
//!
//! Provides a unified error type covering all failure modes: I/O, CSV
//! parsing, configuration parsing and malformed bundle files.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV reading or writing failure.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A bundle file exists but cannot be interpreted as rows.
    #[error("malformed file for bundle {bundle_id}: {details}")]
    MalformedFile {
        /// Bundle whose file is broken.
        bundle_id: String,
        /// What is wrong with it.
        details: String,
    },

    /// The bundle id cannot be used as a file name.
    #[error("invalid bundle id for a file store: {0}")]
    InvalidBundleId(String),

    /// Configuration values that cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
