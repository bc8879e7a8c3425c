//! # Tonewood - Catalog-Grounded Shop Assistant
//!
//! **Tonewood** routes a customer's shopping question through specialist
//! agents and grounds every answer in a product catalog:
//!
//! - **Tonewood LLM**: OpenAI-compatible chat and embedding client
//! - **Tonewood RAG**: catalog index, hybrid retrieval with keyword fallback,
//!   and per-session context
//! - **Tonewood Graph**: intent routing, Information/Recommendation/Negotiation
//!   agents, synthesis, and turn orchestration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tonewood::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = CatalogIndex::load(vec![
//!         CatalogRecord::new("G-001", "Starter Strat", "Fender", "Electric Guitar", 279.0, SkillLevel::Beginner)
//!             .with_genres(["rock"])
//!             .with_discount(10.0),
//!     ])?;
//!
//!     let generator = Arc::new(Client::from_env()?);
//!     let assistant = Orchestrator::from_config(&AssistantConfig::default(), Arc::new(index), generator)?;
//!
//!     let reply = assistant
//!         .handle_turn("session-1", "Any deals on a beginner rock guitar?", PreferenceUpdate::none())
//!         .await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Tonewood                  │
//! │            (Umbrella Crate)             │
//! └──────────────────┬──────────────────────┘
//!                    │
//!        ┌───────────┼───────────┐
//!        │           │           │
//!    ┌───▼──┐    ┌───▼──┐    ┌───▼───┐
//!    │ LLM  │    │ RAG  │    │ Graph │
//!    └──────┘    └──────┘    └───────┘
//! ```

#![doc(html_root_url = "https://docs.rs/tonewood/0.1.0")]
#![warn(missing_docs)]

// Re-export sub-crates
#[cfg(feature = "llm")]
pub use tonewood_llm as llm;

#[cfg(feature = "rag")]
pub use tonewood_rag as rag;

#[cfg(feature = "graph")]
pub use tonewood_graph as graph;

/// Commonly used types and traits
pub mod prelude {
    #[cfg(feature = "llm")]
    pub use crate::llm::{ChatMessage, Client, ClientConfig, GenerationRequest, Generator};

    #[cfg(feature = "rag")]
    pub use crate::rag::{
        CatalogFilters, CatalogIndex, CatalogRecord, ContextStore, EmbeddingProvider,
        HashedTermEmbeddingProvider, HybridRetriever, PreferenceUpdate, PriceRange, RagError,
        RagResult, RetrievalResult, RetrieverConfig, SessionState, SkillLevel,
    };

    #[cfg(feature = "graph")]
    pub use crate::graph::{
        Agent, AgentId, AssistantConfig, DiscountPolicy, GraphError, GraphResult, IntentRouter,
        Orchestrator, TurnReport,
    };
}
