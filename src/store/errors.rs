//! # Store Errors
//!
//! Error types for document store implementations.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a document store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A filter, update, option object or index spec is malformed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Named index does not exist
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// Internal store failure (lock poisoned, invariant broken)
    #[error("internal store error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::InvalidArgument("bad filter".to_string()).to_string(),
            "invalid argument: bad filter"
        );
        assert_eq!(
            StoreError::IndexNotFound("age_1".to_string()).to_string(),
            "index not found: age_1"
        );
    }
}
