//! Error types for persistence and transport.

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure reported by a persistence sink. Sinks are external
/// collaborators, so the message is whatever they gave us.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from the store layer itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cached envelope for a submitted fields id is gone
    #[error("unknown or expired fields id: {fields_id}")]
    EnvelopeExpired { fields_id: String },

    /// Envelope serialization failed
    #[error("envelope serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
