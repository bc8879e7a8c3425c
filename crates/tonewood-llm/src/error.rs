//! Error types for the generation and embedding client

use thiserror::Error;

/// Errors raised by generation and embedding backends
#[derive(Debug, Error)]
pub enum LlmError {
    /// Client configuration is missing or invalid
    #[error("configuration error in '{field}': {message}")]
    Configuration {
        /// Offending configuration field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// Transport-level failure talking to the backend
    #[error("http error during {operation}: {source}")]
    Http {
        /// Operation being performed
        operation: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// Backend did not answer in time
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that timed out
        operation: String,
    },

    /// Backend answered with a payload we could not use
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the problem
        message: String,
    },

    /// Generic generation failure (quota, refusal, scripted failure)
    #[error("generation failed: {message}")]
    Generation {
        /// Description of the failure
        message: String,
    },
}

impl LlmError {
    /// Create a configuration error
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map a transport error, folding reqwest timeouts into [`LlmError::Timeout`]
    pub fn http(operation: impl Into<String>, source: reqwest::Error) -> Self {
        let operation = operation.into();
        if source.is_timeout() {
            Self::Timeout { operation }
        } else {
            Self::Http { operation, source }
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Whether retrying later could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result alias for this crate
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = LlmError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        let bad_request = LlmError::Api {
            status: 400,
            message: "bad".to_string(),
        };

        assert!(rate_limited.is_transient());
        assert!(!bad_request.is_transient());
        assert!(LlmError::Timeout {
            operation: "chat".to_string()
        }
        .is_transient());
        assert!(!LlmError::configuration("api_key", "missing").is_transient());
    }
}
