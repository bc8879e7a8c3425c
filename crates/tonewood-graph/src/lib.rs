//! # Tonewood Graph
//!
//! Turn orchestration for the Tonewood shop assistant. A customer message
//! flows through a fixed pipeline:
//!
//! ```text
//! message ──► IntentRouter ──► HybridRetriever (per agent plan)
//!                                   │
//!              ┌────────────────────┼────────────────────┐
//!              ▼                    ▼                    ▼
//!        Information         Recommendation         Negotiation
//!              └────────────────────┼────────────────────┘
//!                                   ▼
//!                              Synthesizer ──► ContextStore commit ──► reply
//! ```
//!
//! Agents run concurrently, each under its own deadline. A failed agent is
//! replaced by a degraded placeholder; if every activated agent fails the
//! turn returns [`GraphError::TurnFailed`] and the session is untouched.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tonewood_graph::{AssistantConfig, Orchestrator};
//! use tonewood_rag::{CatalogIndex, PreferenceUpdate};
//!
//! # async fn example(index: CatalogIndex) -> Result<(), Box<dyn std::error::Error>> {
//! let generator = Arc::new(tonewood_llm::Client::from_env()?);
//! let assistant = Orchestrator::from_config(&AssistantConfig::default(), Arc::new(index), generator)?;
//!
//! let reply = assistant
//!     .handle_turn("session-1", "I want a beginner guitar for rock, any deals?", PreferenceUpdate::none())
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod agent;
pub mod config;
pub mod discount;
pub mod error;
pub mod orchestrator;
pub mod router;
pub mod synthesizer;

pub use agent::{
    Agent, AgentId, AgentInvocationResult, AgentPayload, AgentSet, AgentSettings,
    InformationAgent, NegotiationAgent, RecommendationAgent, RetrievalPlan,
};
pub use config::AssistantConfig;
pub use discount::{DiscountOffer, DiscountPolicy, DiscountScope, DiscountSource, DiscountTable};
pub use error::{AgentError, GraphError, GraphResult};
pub use orchestrator::{Orchestrator, TurnPhase, TurnReport};
pub use router::{IntentRouter, IntentRule, RouterConfig};
pub use synthesizer::{Synthesis, Synthesizer};
