//! Append-only conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "name")]
pub enum TurnRole {
    /// The customer
    User,
    /// The synthesized reply
    Assistant,
    /// A single agent's contribution
    Agent(String),
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => f.write_str("Customer"),
            TurnRole::Assistant => f.write_str("Assistant"),
            TurnRole::Agent(name) => f.write_str(name),
        }
    }
}

/// One immutable entry in the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Monotonic position within the session
    pub index: u64,

    /// Author
    pub role: TurnRole,

    /// Text
    pub text: String,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

/// Ordered turns for one session
///
/// Turns are only appended; pruning drops the oldest while indices keep
/// increasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    next_index: u64,
}

impl ConversationHistory {
    /// Empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its index
    pub fn append(&mut self, role: TurnRole, text: impl Into<String>) -> u64 {
        let index = self.next_index;
        self.turns.push(ConversationTurn {
            index,
            role,
            text: text.into(),
            timestamp: Utc::now(),
        });
        self.next_index += 1;
        index
    }

    /// All retained turns, oldest first
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Number of retained turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been said
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `n` customer/assistant turns, oldest first
    pub fn recent_dialogue(&self, n: usize) -> Vec<&ConversationTurn> {
        let mut recent: Vec<&ConversationTurn> = self
            .turns
            .iter()
            .rev()
            .filter(|t| matches!(t.role, TurnRole::User | TurnRole::Assistant))
            .take(n)
            .collect();
        recent.reverse();
        recent
    }

    /// Drop the oldest turns beyond `max_len`
    pub fn prune_to(&mut self, max_len: usize) {
        if self.turns.len() > max_len {
            let excess = self.turns.len() - max_len;
            self.turns.drain(..excess);
        }
    }

    /// Recent dialogue as chat messages
    #[cfg(feature = "llm-client")]
    pub fn to_chat_messages(&self, n: usize) -> Vec<tonewood_llm::ChatMessage> {
        self.recent_dialogue(n)
            .into_iter()
            .map(|turn| match turn.role {
                TurnRole::User => tonewood_llm::ChatMessage::user(turn.text.clone()),
                _ => tonewood_llm::ChatMessage::assistant(turn.text.clone()),
            })
            .collect()
    }
}
