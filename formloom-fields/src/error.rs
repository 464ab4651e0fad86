//! Error types for descriptor handling

use thiserror::Error;

/// Result type for fields operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur in descriptor operations
#[derive(Debug, Error)]
pub enum FieldsError {
    /// A scope string did not match the canonical grammar
    #[error("unrecognized scope: {raw}")]
    UnrecognizedScope { raw: String },

    /// A field path failed to parse
    #[error("invalid field path: {0}")]
    Path(#[from] formloom_path::PathError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldsError::UnrecognizedScope {
            raw: "bogus".into(),
        };
        assert_eq!(err.to_string(), "unrecognized scope: bogus");
    }
}
