use super::{build_request, Agent, AgentId, AgentInvocationResult, AgentSettings, RetrievalPlan};
use crate::error::AgentError;
use async_trait::async_trait;
use std::sync::Arc;
use tonewood_llm::Generator;
use tonewood_rag::{CatalogFilters, RetrievalResult, SessionState};
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a knowledgeable assistant at a guitar shop. \
Answer questions about specific models, specifications, and features using only the catalog \
entries you are given. Name the exact models and brands you draw on. If the catalog does not \
cover the question, say so plainly instead of guessing. Keep the tone warm and concise.";

/// Answers product and specification questions from catalog excerpts
pub struct InformationAgent {
    generator: Arc<dyn Generator>,
    settings: AgentSettings,
}

impl InformationAgent {
    /// Create the agent over a generation backend
    pub fn new(generator: Arc<dyn Generator>, settings: AgentSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }
}

#[async_trait]
impl Agent for InformationAgent {
    fn id(&self) -> AgentId {
        AgentId::Information
    }

    /// Facts are looked up for the raw question, without preference filters
    fn retrieval_plan(&self, query: &str, _session: &SessionState) -> RetrievalPlan {
        RetrievalPlan {
            query: query.trim().to_string(),
            filters: CatalogFilters::none(),
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
        let task = format!(
            "Customer says: {query}\n\n{}\n\nAnswer using only the catalog entries above.",
            context.to_prompt_context()
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

        debug!(grounded = context.len(), "Information answer generated");
        Ok(AgentInvocationResult::new(self.id(), content).with_grounding(context.records().cloned()))
    }
}
