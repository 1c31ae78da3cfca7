//! The transport seam between the mapper and the remote API.
//!
//! The mapper never talks HTTP itself. A [`Transport`] fetches pathbuilders
//! and entities and stores entity payloads; authentication, base urls,
//! timeouts and retries all belong to the implementation.

use serde_json::Value as JsonValue;
use thiserror::Error;
use wisski_core::SchemaTree;

/// Access to a remote WissKI instance.
pub trait Transport {
    /// Returns the ids of the pathbuilders active on the remote.
    fn list_pathbuilders(&mut self) -> Result<Vec<String>, TransportError>;

    /// Fetches and parses one pathbuilder.
    fn fetch_paths(&mut self, pathbuilder_id: &str) -> Result<SchemaTree, TransportError>;

    /// Fetches the nested payload of one entity.
    fn fetch_entity(&mut self, uri: &str) -> Result<JsonValue, TransportError>;

    /// Creates or updates one entity and returns the payload the remote
    /// stored, including its uri.
    fn create_or_update_entity(
        &mut self,
        bundle_id: &str,
        payload: &JsonValue,
    ) -> Result<JsonValue, TransportError>;
}

/// Failures reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote answered with a non-success status.
    #[error("remote returned status {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The remote could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The response could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Returns `true` if repeating the request may succeed: network
    /// failures, `429` and `5xx` responses.
    ///
    /// # Examples
    ///
    /// ```
    /// use wisski_remote::TransportError;
    ///
    /// let busy = TransportError::Status { code: 503, body: String::new() };
    /// let missing = TransportError::Status { code: 404, body: String::new() };
    /// assert!(busy.is_retryable());
    /// assert!(!missing.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Status { code, .. } => *code == 429 || (500..600).contains(code),
            TransportError::Decode(_) => false,
        }
    }
}
