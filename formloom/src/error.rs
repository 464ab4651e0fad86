//! Facade error type.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to the host. Validation failures are never errors;
/// they come back as a redirect outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] formloom_store::StoreError),
}
