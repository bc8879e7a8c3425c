//! Per-session state storage with one-turn-at-a-time commits

use super::{PreferenceUpdate, SessionState, TurnRole};
use crate::error::{RagError, RagResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Storage for session state
///
/// `save` must replace the stored state in a single step so a turn is
/// either fully visible or not at all.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Fetch a session, `None` if it was never created
    async fn load(&self, session_id: &str) -> RagResult<Option<SessionState>>;

    /// Replace a session's state
    async fn save(&self, session_id: &str, state: &SessionState) -> RagResult<()>;

    /// Delete a session, returning whether it existed
    async fn remove(&self, session_id: &str) -> RagResult<bool>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Process-local session backend
#[derive(Debug, Default)]
pub struct InMemorySessionBackend {
    sessions: DashMap<String, SessionState>,
}

impl InMemorySessionBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is stored
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionBackend for InMemorySessionBackend {
    async fn load(&self, session_id: &str) -> RagResult<Option<SessionState>> {
        Ok(self.sessions.get(session_id).map(|s| s.value().clone()))
    }

    async fn save(&self, session_id: &str, state: &SessionState) -> RagResult<()> {
        self.sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> RagResult<bool> {
        Ok(self.sessions.remove(session_id).is_some())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Context store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Turns retained per session; oldest are pruned first
    pub max_history: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_history: 50 }
    }
}

impl ContextConfig {
    /// Set the history limit
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

/// Everything one turn writes back
#[derive(Debug, Clone, Default)]
pub struct TurnCommit {
    /// Preference changes to merge non-destructively
    pub preference_update: PreferenceUpdate,

    /// Turns to append, in order
    pub turns: Vec<(TurnRole, String)>,
}

impl TurnCommit {
    /// Empty commit
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preference update
    pub fn with_preferences(mut self, update: PreferenceUpdate) -> Self {
        self.preference_update = update;
        self
    }

    /// Append a turn
    pub fn with_turn(mut self, role: TurnRole, text: impl Into<String>) -> Self {
        self.turns.push((role, text.into()));
        self
    }
}

/// Owner of all session state
///
/// Turns on the same session are serialized through a per-session lock;
/// distinct sessions proceed independently.
pub struct ContextStore {
    backend: Arc<dyn SessionBackend>,
    locks: Arc<SessionLocks>,
    config: ContextConfig,
}

/// Lock per session id. An entry is only removed by the turn holding it.
type SessionLocks = DashMap<String, Arc<Mutex<()>>>;

impl ContextStore {
    /// Create a store over a backend
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            locks: Arc::new(DashMap::new()),
            config: ContextConfig::default(),
        }
    }

    /// Create a store over a fresh in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionBackend::new()))
    }

    /// Set configuration
    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Sessions that currently have a lock entry
    pub fn tracked_sessions(&self) -> usize {
        self.locks.len()
    }

    /// Start a turn: waits for any in-flight turn on the session, then
    /// takes a snapshot of its state
    ///
    /// Dropping the returned [`SessionTurn`] without committing leaves the
    /// stored state untouched.
    pub async fn begin_turn(&self, session_id: &str) -> RagResult<SessionTurn> {
        validate_session_id(session_id)?;

        // A lock removed from the map while we waited on it no longer
        // guards the session; take the current one instead.
        let (lock, guard) = loop {
            let lock = self
                .locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            let guard = Arc::clone(&lock).lock_owned().await;

            let current = self
                .locks
                .get(session_id)
                .is_some_and(|entry| Arc::ptr_eq(entry.value(), &lock));
            if current {
                break (lock, guard);
            }
            debug!(session_id = %session_id, "Session lock released while waiting, retrying");
        };

        let stored = self.backend.load(session_id).await?;
        let release_lock = stored.is_none();
        let state = stored.unwrap_or_default();
        debug!(
            session_id = %session_id,
            history_len = state.history.len(),
            backend = self.backend.name(),
            "Session turn started"
        );

        Ok(SessionTurn {
            session_id: session_id.to_string(),
            state: Arc::new(state),
            backend: Arc::clone(&self.backend),
            max_history: self.config.max_history,
            locks: Arc::clone(&self.locks),
            lock,
            release_lock,
            _guard: guard,
        })
    }

    /// Read-only copy of a session, `None` if it does not exist
    pub async fn snapshot(&self, session_id: &str) -> RagResult<Option<SessionState>> {
        validate_session_id(session_id)?;
        self.backend.load(session_id).await
    }

    /// Apply explicit preference edits outside of a conversational turn
    pub async fn update_preferences(
        &self,
        session_id: &str,
        update: PreferenceUpdate,
    ) -> RagResult<SessionState> {
        self.begin_turn(session_id)
            .await?
            .commit(TurnCommit::new().with_preferences(update))
            .await
    }

    /// Destroy a session
    pub async fn end_session(&self, session_id: &str) -> RagResult<bool> {
        validate_session_id(session_id)?;
        let mut turn = self.begin_turn(session_id).await?;
        let existed = self.backend.remove(session_id).await?;
        turn.release_lock = true;
        drop(turn);

        info!(session_id = %session_id, existed, "Session ended");
        Ok(existed)
    }
}

/// Exclusive access to one session for the duration of a turn
///
/// A turn that ends with no stored session behind it drops the session's
/// lock entry, so failed first turns leave nothing tracked.
pub struct SessionTurn {
    session_id: String,
    state: Arc<SessionState>,
    backend: Arc<dyn SessionBackend>,
    max_history: usize,
    locks: Arc<SessionLocks>,
    lock: Arc<Mutex<()>>,
    release_lock: bool,
    _guard: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for SessionTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTurn")
            .field("session_id", &self.session_id)
            .field("max_history", &self.max_history)
            .field("release_lock", &self.release_lock)
            .finish_non_exhaustive()
    }
}

impl SessionTurn {
    /// Session identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// State as it was when the turn began
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Shared read-only handle to the snapshot
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// Write the turn's changes in one step and release the session
    pub async fn commit(mut self, commit: TurnCommit) -> RagResult<SessionState> {
        let mut next = SessionState::clone(&self.state);
        next.preferences.apply(&commit.preference_update);
        for (role, text) in commit.turns {
            next.history.append(role, text);
        }
        next.history.prune_to(self.max_history);

        self.backend.save(&self.session_id, &next).await?;
        self.release_lock = false;

        debug!(
            session_id = %self.session_id,
            history_len = next.history.len(),
            "Session turn committed"
        );
        Ok(next)
    }
}

impl Drop for SessionTurn {
    fn drop(&mut self) {
        // Runs before the guard is released, so no other turn holds this lock.
        if self.release_lock {
            self.locks
                .remove_if(&self.session_id, |_, lock| Arc::ptr_eq(lock, &self.lock));
        }
    }
}

/// Generate a fresh session identifier
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

fn validate_session_id(session_id: &str) -> RagResult<()> {
    if session_id.trim().is_empty() {
        return Err(RagError::validation(
            "session_id",
            "must not be empty",
            session_id,
        ));
    }
    Ok(())
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStore")
            .field("backend", &self.backend.name())
            .field("active_sessions", &self.locks.len())
            .field("config", &self.config)
            .finish()
    }
}
