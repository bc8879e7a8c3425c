//! # Session Context
//!
//! Per-session conversation history and customer preferences. The
//! [`ContextStore`] is the only writer; everything else reads a
//! [`SessionState`] snapshot.
//!
//! ```rust
//! use tonewood_rag::session::{ContextStore, PreferenceUpdate, TurnCommit, TurnRole};
//! use tonewood_rag::catalog::SkillLevel;
//!
//! # async fn example() -> tonewood_rag::RagResult<()> {
//! let store = ContextStore::in_memory();
//!
//! let turn = store.begin_turn("session-1").await?;
//! turn.commit(
//!     TurnCommit::new()
//!         .with_preferences(PreferenceUpdate::none().with_skill_level(SkillLevel::Beginner))
//!         .with_turn(TurnRole::User, "I just started playing"),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

mod history;
mod preferences;
mod store;

pub use history::{ConversationHistory, ConversationTurn, TurnRole};
pub use preferences::{PreferenceUpdate, UserPreferences};
pub use store::{
    generate_session_id, ContextConfig, ContextStore, InMemorySessionBackend, SessionBackend,
    SessionTurn, TurnCommit,
};

use serde::{Deserialize, Serialize};

/// Everything known about one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Declared and inferred preferences
    pub preferences: UserPreferences,

    /// Ordered turns
    pub history: ConversationHistory,
}
