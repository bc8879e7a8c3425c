//! Error types for routing, agents, and turn orchestration

use crate::agent::AgentId;
use thiserror::Error;
use tonewood_llm::LlmError;
use tonewood_rag::RagError;

/// Errors surfaced by the orchestrator
#[derive(Debug, Error)]
pub enum GraphError {
    /// Every activated agent failed, or a turn-level step errored
    #[error("turn failed for session '{session_id}': {reason}")]
    TurnFailed {
        /// Session the turn belonged to
        session_id: String,
        /// Failure description
        reason: String,
    },

    /// Session context could not be read or written
    #[error("session context error: {0}")]
    Context(#[from] RagError),

    /// Agent results could not be combined
    #[error("synthesis failed: {message}")]
    Synthesis {
        /// Failure description
        message: String,
    },

    /// Invalid configuration
    #[error("configuration error: {message}")]
    Configuration {
        /// Failure description
        message: String,
    },
}

impl GraphError {
    /// Create a turn failure
    pub fn turn_failed(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TurnFailed {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a synthesis error
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Apologetic text suitable for showing to the customer
    pub fn user_message(&self) -> &'static str {
        match self {
            GraphError::TurnFailed { .. } | GraphError::Context(_) | GraphError::Synthesis { .. } => {
                "Sorry, I couldn't put together an answer just now. \
                 Your preferences and our conversation so far are saved, so please try again."
            }
            GraphError::Configuration { .. } => {
                "Sorry, the shop assistant is not configured correctly right now."
            }
        }
    }
}

impl From<config::ConfigError> for GraphError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

/// Result type for orchestration
pub type GraphResult<T> = Result<T, GraphError>;

/// A single agent's failure within a turn
#[derive(Debug, Error)]
pub enum AgentError {
    /// The generation backend failed
    #[error("{agent} generation failed: {source}")]
    Generation {
        /// Failing agent
        agent: AgentId,
        /// Backend error
        #[source]
        source: LlmError,
    },

    /// The agent did not answer within its deadline
    #[error("{agent} timed out after {millis}ms")]
    Timeout {
        /// Failing agent
        agent: AgentId,
        /// Deadline in milliseconds
        millis: u64,
    },

    /// Any other agent-internal failure
    #[error("{agent} failed: {message}")]
    Internal {
        /// Failing agent
        agent: AgentId,
        /// Failure description
        message: String,
    },
}

impl AgentError {
    /// Wrap a generation error
    pub fn generation(agent: AgentId, source: LlmError) -> Self {
        Self::Generation { agent, source }
    }

    /// Agent that failed
    pub fn agent(&self) -> AgentId {
        match self {
            AgentError::Generation { agent, .. }
            | AgentError::Timeout { agent, .. }
            | AgentError::Internal { agent, .. } => *agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_failed_has_user_message() {
        let err = GraphError::turn_failed("s1", "all agents failed");
        assert!(err.to_string().contains("s1"));
        assert!(err.user_message().starts_with("Sorry"));
    }

    #[test]
    fn test_agent_error_reports_agent() {
        let err = AgentError::Timeout {
            agent: AgentId::Negotiation,
            millis: 30_000,
        };
        assert_eq!(err.agent(), AgentId::Negotiation);
        assert!(err.to_string().contains("Negotiation Agent"));
    }
}
