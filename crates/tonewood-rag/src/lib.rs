//! # Tonewood RAG
//!
//! Catalog grounding for the Tonewood shop assistant:
//!
//! - **Catalog Index**: normalized product records with field-weighted
//!   keyword search and an optional dense vector index over the same records
//! - **Hybrid Retriever**: vector search first, deterministic keyword
//!   fallback when the index is missing, the embedding backend fails, or the
//!   call times out
//! - **Session Context**: per-session history and preferences with
//!   all-or-nothing turn commits
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tonewood_rag::prelude::*;
//!
//! # async fn example() -> RagResult<()> {
//! let index = CatalogIndex::load(vec![
//!     CatalogRecord::new("G-001", "Starter Strat", "Fender", "Electric Guitar", 279.0, SkillLevel::Beginner)
//!         .with_genres(["rock", "blues"]),
//! ])?;
//!
//! let retriever = HybridRetriever::new(Arc::new(index), RetrieverConfig::default());
//! let result = retriever
//!     .retrieve("strat for rock", &CatalogFilters::none().with_skill_level(SkillLevel::Beginner), 5)
//!     .await;
//!
//! assert_eq!(result.ids(), vec!["G-001"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod embedding;
pub mod error;
pub mod retrieval;
pub mod session;

pub use catalog::{
    CatalogFilters, CatalogIndex, CatalogRecord, FieldWeights, PriceRange, SkillLevel,
};
#[cfg(feature = "llm-client")]
pub use embedding::ClientEmbeddingProvider;
pub use embedding::{Embedding, EmbeddingProvider, HashedTermEmbeddingProvider};
pub use error::{RagError, RagResult};
pub use retrieval::{HybridRetriever, MatchKind, RetrievalResult, RetrieverConfig, ScoredRecord};
pub use session::{
    generate_session_id, ContextConfig, ContextStore, ConversationHistory, ConversationTurn, PreferenceUpdate,
    SessionState, SessionTurn, TurnCommit, TurnRole, UserPreferences,
};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::catalog::{CatalogFilters, CatalogIndex, CatalogRecord, PriceRange, SkillLevel};
    pub use crate::embedding::{EmbeddingProvider, HashedTermEmbeddingProvider};
    pub use crate::error::{RagError, RagResult};
    pub use crate::retrieval::{HybridRetriever, MatchKind, RetrievalResult, RetrieverConfig};
    pub use crate::session::{
        ContextStore, PreferenceUpdate, SessionState, TurnCommit, TurnRole, UserPreferences,
    };
}
