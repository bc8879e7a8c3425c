//! Assistant configuration

use crate::discount::{DiscountPolicy, DiscountTable};
use crate::error::{GraphError, GraphResult};
use crate::router::RouterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tonewood_rag::retrieval::millis;
use tonewood_rag::{ContextConfig, RetrieverConfig};

/// Everything the orchestrator needs to know besides its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Hybrid retrieval settings
    pub retriever: RetrieverConfig,

    /// Session history settings
    pub context: ContextConfig,

    /// Deadline for each agent's retrieval plus answer
    #[serde(with = "millis")]
    pub agent_timeout: Duration,

    /// Customer/assistant turns included in agent prompts
    pub history_window: usize,

    /// Products the Recommendation agent suggests
    pub max_recommendations: usize,

    /// Products the Negotiation agent prices
    pub max_offers: usize,

    /// Intent routing
    pub router: RouterConfig,

    /// Store-wide discounts, first match wins
    pub discount_policies: Vec<DiscountPolicy>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            retriever: RetrieverConfig::default(),
            context: ContextConfig::default(),
            agent_timeout: Duration::from_secs(30),
            history_window: 6,
            max_recommendations: 3,
            max_offers: 3,
            router: RouterConfig::default(),
            discount_policies: Vec::new(),
        }
    }
}

impl AssistantConfig {
    /// Load defaults, then an optional TOML file, then `TONEWOOD__` environment overrides
    ///
    /// Nested keys use `__`, e.g. `TONEWOOD__RETRIEVER__TOP_K=8`.
    pub fn load(path: Option<&Path>) -> GraphResult<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TONEWOOD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> GraphResult<()> {
        if self.agent_timeout.is_zero() {
            return Err(GraphError::configuration("agent_timeout must be positive"));
        }
        if self.max_recommendations == 0 || self.max_offers == 0 {
            return Err(GraphError::configuration(
                "max_recommendations and max_offers must be at least 1",
            ));
        }
        self.discount_table().map(|_| ())
    }

    /// The configured discount policies as a lookup table
    pub fn discount_table(&self) -> GraphResult<DiscountTable> {
        DiscountTable::new(self.discount_policies.clone())
    }

    /// Set the agent deadline
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Set retrieval settings
    pub fn with_retriever(mut self, retriever: RetrieverConfig) -> Self {
        self.retriever = retriever;
        self
    }

    /// Set routing settings
    pub fn with_router(mut self, router: RouterConfig) -> Self {
        self.router = router;
        self
    }

    /// Add a discount policy
    pub fn with_discount_policy(mut self, policy: DiscountPolicy) -> Self {
        self.discount_policies.push(policy);
        self
    }
}
