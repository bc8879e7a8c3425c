use super::{
    build_request, preference_query, Agent, AgentId, AgentInvocationResult, AgentPayload,
    AgentSettings, RetrievalPlan,
};
use crate::error::AgentError;
use async_trait::async_trait;
use std::sync::Arc;
use tonewood_llm::Generator;
use tonewood_rag::{CatalogRecord, RetrievalResult, SessionState, UserPreferences};
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a guitar matchmaker at a guitar shop. \
Recommend guitars only from the shortlist you are given, best match first. For each one, say \
why it suits the customer's experience, music, and budget. Never suggest models that are not on \
the shortlist.";

/// Suggests products that satisfy the customer's preferences
pub struct RecommendationAgent {
    generator: Arc<dyn Generator>,
    settings: AgentSettings,
    max_recommendations: usize,
}

impl RecommendationAgent {
    /// Create the agent over a generation backend
    pub fn new(generator: Arc<dyn Generator>, settings: AgentSettings) -> Self {
        Self {
            generator,
            settings,
            max_recommendations: 3,
        }
    }

    /// Limit how many products are recommended
    pub fn with_max_recommendations(mut self, max: usize) -> Self {
        self.max_recommendations = max.max(1);
        self
    }
}

/// Hard constraints: skill level and budget must both hold
fn satisfies(preferences: &UserPreferences, record: &CatalogRecord) -> bool {
    preferences
        .skill_level
        .map_or(true, |level| record.skill_level == level)
        && preferences
            .budget
            .map_or(true, |budget| budget.contains(record.price))
}

#[async_trait]
impl Agent for RecommendationAgent {
    fn id(&self) -> AgentId {
        AgentId::Recommendation
    }

    fn retrieval_plan(&self, query: &str, session: &SessionState) -> RetrievalPlan {
        RetrievalPlan {
            query: preference_query(query, session),
            filters: session.preferences.to_filters(),
            top_k: self.settings.top_k,
            pin_named: false,
        }
    }

    async fn respond(
        &self,
        query: &str,
        context: &RetrievalResult,
        session: &SessionState,
    ) -> Result<AgentInvocationResult, AgentError> {
        let preferences = &session.preferences;
        let shortlist = context
            .clone()
            .retain(|record| satisfies(preferences, record))
            .truncated(self.max_recommendations);

        debug!(
            retrieved = context.len(),
            shortlisted = shortlist.len(),
            "Recommendation candidates filtered"
        );

        if shortlist.is_empty() {
            let content = if preferences.is_empty() {
                "I couldn't find a guitar in our catalog that fits that request. \
                 Tell me a bit about your experience, budget, or favourite music and I'll narrow it down."
                    .to_string()
            } else {
                format!(
                    "I couldn't find a guitar in our catalog that matches all of your preferences:\n{}\n\
                     Loosening the budget or skill level would open up more options.",
                    preferences.describe()
                )
            };
            return Ok(AgentInvocationResult::new(self.id(), content));
        }

        let task = format!(
            "Customer says: {query}\n\nCustomer preferences:\n{}\n\nShortlist:\n{}\n\n\
             Recommend from the shortlist only.",
            preferences.describe(),
            shortlist.to_prompt_context()
        );
        let request = build_request(SYSTEM_PROMPT, task, session, self.settings.history_window);

        let content = self
            .generator
            .generate(request)
            .await
            .map_err(|e| AgentError::generation(self.id(), e))?;
        let content = content.trim();
        if content.is_empty() {
            return Err(AgentError::Internal {
                agent: self.id(),
                message: "generator returned an empty answer".to_string(),
            });
        }

        let record_ids = shortlist.ids().into_iter().map(str::to_string).collect();
        Ok(AgentInvocationResult::new(self.id(), content)
            .with_grounding(shortlist.records().cloned())
            .with_payload(AgentPayload::Recommendations { record_ids }))
    }
}
