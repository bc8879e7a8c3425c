//! Error types for catalog indexing, retrieval, and session context

use thiserror::Error;

/// Errors raised by the retrieval and context layers
#[derive(Debug, Error)]
pub enum RagError {
    /// No vector backend is built or reachable
    #[error("vector index unavailable: {reason}")]
    IndexUnavailable {
        /// Why the index cannot serve
        reason: String,
    },

    /// The embedding backend failed
    #[error("embedding provider '{provider}' failed: {message}")]
    Embedding {
        /// Provider name
        provider: String,
        /// Failure description
        message: String,
    },

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Deadline in milliseconds
        millis: u64,
    },

    /// Input failed validation
    #[error("validation failed for '{field}': {constraint} (got {value})")]
    Validation {
        /// Field under validation
        field: String,
        /// Constraint that was violated
        constraint: String,
        /// Offending value
        value: String,
    },

    /// Session storage failure
    #[error("storage operation '{operation}' failed: {message}")]
    Storage {
        /// Operation being performed
        operation: String,
        /// Failure description
        message: String,
    },
}

impl RagError {
    /// Create an index-unavailable error
    pub fn index_unavailable(reason: impl Into<String>) -> Self {
        Self::IndexUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, millis: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis,
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
        }
    }

    /// Create a storage error
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the hybrid retriever recovers from this error with keyword search
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(
            self,
            Self::IndexUnavailable { .. } | Self::Embedding { .. } | Self::Timeout { .. }
        )
    }
}

/// Result alias for this crate
pub type RagResult<T> = Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_triggers() {
        assert!(RagError::index_unavailable("not built").is_fallback_trigger());
        assert!(RagError::embedding("hash", "boom").is_fallback_trigger());
        assert!(RagError::timeout("vector_search", 10).is_fallback_trigger());
        assert!(!RagError::validation("id", "unique", "G-1").is_fallback_trigger());
        assert!(!RagError::storage("save", "disk full").is_fallback_trigger());
    }
}
