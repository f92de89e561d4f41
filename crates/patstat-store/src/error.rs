//! Store error types.
//!
//! A [`StoreError`] always means infrastructure trouble, never "not cached".
//! The resolver relies on that distinction to fail requests under a degraded
//! store instead of stampeding the external providers.

/// Errors that can occur during cache store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to reach the backing store.
    #[error("Store connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("Store serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal store error occurred.
    #[error("Internal store error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::connection("refused");
        assert_eq!(err.to_string(), "Store connection error: refused");

        let err = StoreError::serialization("bad json");
        assert_eq!(err.to_string(), "Store serialization error: bad json");

        let err = StoreError::internal("oops");
        assert_eq!(err.to_string(), "Internal store error: oops");
    }

    #[test]
    fn test_error_predicates() {
        assert!(StoreError::connection("x").is_connection());
        assert!(!StoreError::internal("x").is_connection());
    }
}
