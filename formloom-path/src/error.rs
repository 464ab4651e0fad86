//! Error types for path parsing

use thiserror::Error;

/// Result type for path operations
pub type Result<T> = std::result::Result<T, PathError>;

/// Errors that can occur when parsing a path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// Path string was empty
    #[error("empty path")]
    Empty,

    /// A segment between separators was empty
    #[error("empty segment at position {position} in '{path}'")]
    EmptySegment { path: String, position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PathError::EmptySegment {
            path: "item::qty".into(),
            position: 1,
        };
        assert_eq!(err.to_string(), "empty segment at position 1 in 'item::qty'");
    }
}
