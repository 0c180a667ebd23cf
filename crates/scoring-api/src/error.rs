//! Error types for stores and method handlers.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`Store`](crate::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not serve the request.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// A stored value could not be decoded.
    #[error("Malformed value for key '{key}': {message}")]
    Malformed {
        /// The key whose value was bad.
        key: String,
        /// Error message.
        message: String,
    },

    /// I/O error while loading a seed file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading a seed file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a malformed value error.
    pub fn malformed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while executing a method handler.
///
/// Every variant is reported to clients as an opaque internal error.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The result could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The handler panicked.
    #[error("Handler panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::unavailable("connection refused");
        assert_eq!(err.to_string(), "Store unavailable: connection refused");

        let err = StoreError::malformed("i:1", "expected a list");
        assert_eq!(err.to_string(), "Malformed value for key 'i:1': expected a list");
    }

    #[test]
    fn test_handler_error_from_store() {
        let err: HandlerError = StoreError::unavailable("down").into();
        assert!(matches!(err, HandlerError::Store(_)));
        assert_eq!(err.to_string(), "Store error: Store unavailable: down");
    }
}
