//! Error types for the kvault engine.

use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in kvault engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Row-store error.
    #[error("store error: {0}")]
    Store(#[from] kvault_store::StoreError),

    /// Input failed validation before any I/O or crypto work.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the violated precondition.
        message: String,
    },

    /// An operation exceeded its time bound.
    ///
    /// The effect on the backend is indeterminate: a write that timed
    /// out may still have been applied.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// The operation that was abandoned.
        operation: &'static str,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// Key derivation, encryption, or tag verification failed.
    ///
    /// Surfaced only as "no plaintext available" - never as partial or
    /// garbage plaintext.
    #[error("crypto failure: {message}")]
    Crypto {
        /// Description of the failure.
        message: String,
    },

    /// The schedule queue or chunk budget is exhausted.
    #[error("capacity exceeded: {message}")]
    Capacity {
        /// Description of the exhausted bound.
        message: String,
    },

    /// A chunk named by a control entry could not be read.
    #[error("incomplete value for key '{key}': missing chunk {missing} of {expected}")]
    IncompleteValue {
        /// The logical key being read.
        key: String,
        /// Index of the first missing chunk.
        missing: u32,
        /// Chunk count recorded by the control entry.
        expected: u32,
    },

    /// An operation was invoked in a state that does not permit it.
    #[error("cannot {operation}: vault is {state}")]
    InvalidState {
        /// The operation that was refused.
        operation: &'static str,
        /// The state the vault was in.
        state: &'static str,
    },

    /// A typed value could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: &'static str, timeout: Duration) -> Self {
        Self::Timeout { operation, timeout }
    }

    /// Creates a crypto error.
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Creates a capacity error.
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::Capacity {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Returns true when the error indicates the key could not be read,
    /// as opposed to the key being absent.
    #[must_use]
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            Self::IncompleteValue { .. } | Self::Crypto { .. } | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = CoreError::validation("empty key");
        assert_eq!(err.to_string(), "validation failed: empty key");

        let err = CoreError::timeout("get", Duration::from_secs(30));
        assert!(err.to_string().contains("get timed out"));
    }

    #[test]
    fn incomplete_value_is_read_failure() {
        let err = CoreError::IncompleteValue {
            key: "k".into(),
            missing: 2,
            expected: 4,
        };
        assert!(err.is_read_failure());
        assert!(!CoreError::validation("x").is_read_failure());
    }
}
