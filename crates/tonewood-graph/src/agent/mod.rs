//! # Specialist Agents
//!
//! Each agent turns (query, retrieved catalog context, session snapshot)
//! into an [`AgentInvocationResult`]. Agents hold no per-conversation state;
//! everything they know about the customer comes from the [`SessionState`]
//! they are lent for the turn.

mod information;
mod negotiation;
mod recommendation;

pub use information::InformationAgent;
pub use negotiation::NegotiationAgent;
pub use recommendation::RecommendationAgent;

use crate::discount::DiscountOffer;
use crate::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tonewood_llm::{ChatMessage, GenerationRequest};
use tonewood_rag::{
    CatalogFilters, CatalogRecord, PreferenceUpdate, RetrievalResult, SessionState,
};

/// The agents a message can activate
///
/// The derived ordering is the order contributions appear in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    /// Product facts and specifications
    Information,
    /// Product suggestions matching preferences
    Recommendation,
    /// Pricing, discounts, and deals
    Negotiation,
}

impl AgentId {
    /// Every agent, in reply order
    pub const ALL: [AgentId; 3] = [
        AgentId::Information,
        AgentId::Recommendation,
        AgentId::Negotiation,
    ];

    /// Display name used in history and logs
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentId::Information => "Information Agent",
            AgentId::Recommendation => "Recommendation Agent",
            AgentId::Negotiation => "Negotiation Agent",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What an agent wants retrieved before it responds
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalPlan {
    /// Search text
    pub query: String,

    /// Pre-ranking filters
    pub filters: CatalogFilters,

    /// Maximum results
    pub top_k: usize,

    /// Also include records the message names, whatever the filters say
    pub pin_named: bool,
}

/// Structured data an agent attaches to its answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentPayload {
    /// Product ids recommended, best first
    Recommendations {
        /// Recommended record ids
        record_ids: Vec<String>,
    },
    /// Cited discount offers
    Offers {
        /// Offers, one per product
        offers: Vec<DiscountOffer>,
    },
}

/// One agent's answer for one turn
#[derive(Debug, Clone)]
pub struct AgentInvocationResult {
    /// Producing agent
    pub agent: AgentId,

    /// Free-text answer
    pub content: String,

    /// Catalog records the answer is grounded on
    pub grounded: Vec<Arc<CatalogRecord>>,

    /// Structured extras
    pub payload: Option<AgentPayload>,

    /// Preference changes the agent inferred
    pub preference_delta: PreferenceUpdate,

    /// Whether this is a placeholder for a failed agent
    pub degraded: bool,
}

impl AgentInvocationResult {
    /// A successful answer
    pub fn new(agent: AgentId, content: impl Into<String>) -> Self {
        Self {
            agent,
            content: content.into(),
            grounded: Vec::new(),
            payload: None,
            preference_delta: PreferenceUpdate::none(),
            degraded: false,
        }
    }

    /// Placeholder standing in for a failed agent
    pub fn degraded(agent: AgentId) -> Self {
        Self {
            degraded: true,
            ..Self::new(agent, String::new())
        }
    }

    /// Set grounding records
    pub fn with_grounding(mut self, records: impl IntoIterator<Item = Arc<CatalogRecord>>) -> Self {
        self.grounded = records.into_iter().collect();
        self
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: AgentPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach an inferred preference change
    pub fn with_preference_delta(mut self, delta: PreferenceUpdate) -> Self {
        self.preference_delta = delta;
        self
    }

    /// Ids of the grounding records
    pub fn grounded_ids(&self) -> Vec<&str> {
        self.grounded.iter().map(|r| r.id.as_str()).collect()
    }
}

/// A specialist that answers one aspect of a shopping question
#[async_trait]
pub trait Agent: Send + Sync {
    /// Which agent this is
    fn id(&self) -> AgentId;

    /// Retrieval this agent needs for the query
    fn retrieval_plan(&self, query: &str, session: &SessionState) -> RetrievalPlan;

    /// Answer the query from the retrieved context
    async fn respond(
        &self,
        query: &str,
        context: &RetrievalResult,
        session: &SessionState,
    ) -> Result<AgentInvocationResult, AgentError>;
}

/// Registry of agent implementations keyed by [`AgentId`]
#[derive(Clone, Default)]
pub struct AgentSet {
    agents: BTreeMap<AgentId, Arc<dyn Agent>>,
}

impl AgentSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, replacing any previous one with the same id
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(agent.id(), agent);
        self
    }

    /// Look up an agent
    pub fn get(&self, id: AgentId) -> Option<&Arc<dyn Agent>> {
        self.agents.get(&id)
    }

    /// Registered ids in reply order
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys().copied()
    }

    /// Number of registered agents
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agent is registered
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl fmt::Debug for AgentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.agents.keys()).finish()
    }
}

/// Settings shared by the built-in agents
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Results requested from retrieval
    pub top_k: usize,

    /// Recent customer/assistant turns included in prompts
    pub history_window: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            history_window: 6,
        }
    }
}

/// Assemble a prompt: system text, recent dialogue, then the task
pub(crate) fn build_request(
    system_prompt: &str,
    task: String,
    session: &SessionState,
    history_window: usize,
) -> GenerationRequest {
    GenerationRequest::new(system_prompt)
        .with_messages(session.history.to_chat_messages(history_window))
        .with_message(ChatMessage::user(task))
}

/// Search text enriched with the customer's preference terms
pub(crate) fn preference_query(query: &str, session: &SessionState) -> String {
    let prefs = &session.preferences;
    let mut parts = vec![query.trim().to_string()];
    if let Some(level) = prefs.skill_level {
        parts.push(level.as_str().to_string());
    }
    parts.extend(prefs.genres.iter().cloned());
    parts.join(" ")
}
