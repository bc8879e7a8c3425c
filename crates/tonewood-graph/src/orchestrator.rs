//! One conversational turn, end to end
//!
//! `Idle -> RouterEvaluating -> Retrieving -> AgentsExecuting -> Synthesizing -> Idle`.
//! Nothing is written to the session until the turn has a reply; a turn that
//! fails or is cancelled leaves the session exactly as it was.

use crate::agent::{
    AgentId, AgentInvocationResult, AgentSet, AgentSettings, InformationAgent, NegotiationAgent,
    RecommendationAgent,
};
use crate::config::AssistantConfig;
use crate::error::{AgentError, GraphError, GraphResult};
use crate::router::IntentRouter;
use crate::synthesizer::Synthesizer;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tonewood_llm::Generator;
use tonewood_rag::{
    CatalogIndex, ContextStore, HybridRetriever, PreferenceUpdate, RetrievalResult, SessionState,
    TurnCommit, TurnRole,
};
use tracing::{debug, info, warn};

/// States a turn passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn in progress
    Idle,
    /// Choosing agents and inferring preferences
    RouterEvaluating,
    /// Fetching each agent's catalog context
    Retrieving,
    /// Agents answering concurrently
    AgentsExecuting,
    /// Combining answers
    Synthesizing,
}

/// Outcome of a completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Reply text
    pub text: String,

    /// Agents the router activated
    pub activated: BTreeSet<AgentId>,

    /// Activated agents that failed or timed out
    pub degraded: BTreeSet<AgentId>,

    /// Phases traversed, in order
    pub phases: Vec<TurnPhase>,

    /// Catalog ids the reply is grounded on
    pub grounded_ids: BTreeSet<String>,
}

/// Runs turns: Router, Retriever, Agents, Synthesizer, then Context Store
pub struct Orchestrator {
    router: IntentRouter,
    retriever: Arc<HybridRetriever>,
    agents: AgentSet,
    synthesizer: Synthesizer,
    store: Arc<ContextStore>,
    agent_timeout: Duration,
}

impl Orchestrator {
    /// Compose an orchestrator from its collaborators
    pub fn new(
        router: IntentRouter,
        retriever: Arc<HybridRetriever>,
        agents: AgentSet,
        store: Arc<ContextStore>,
    ) -> Self {
        Self {
            router,
            retriever,
            agents,
            synthesizer: Synthesizer::new(),
            store,
            agent_timeout: Duration::from_secs(30),
        }
    }

    /// Build the standard three-agent assistant over a catalog and a generator
    pub fn from_config(
        config: &AssistantConfig,
        index: Arc<CatalogIndex>,
        generator: Arc<dyn Generator>,
    ) -> GraphResult<Self> {
        config.validate()?;

        let settings = AgentSettings {
            top_k: config.retriever.top_k,
            history_window: config.history_window,
        };
        let agents = AgentSet::new()
            .with_agent(Arc::new(InformationAgent::new(
                Arc::clone(&generator),
                settings.clone(),
            )))
            .with_agent(Arc::new(
                RecommendationAgent::new(Arc::clone(&generator), settings.clone())
                    .with_max_recommendations(config.max_recommendations),
            ))
            .with_agent(Arc::new(
                NegotiationAgent::new(generator, settings, config.discount_table()?)
                    .with_max_offers(config.max_offers),
            ));

        let store = ContextStore::in_memory().with_config(config.context.clone());

        Ok(Self::new(
            IntentRouter::new(config.router.clone())?,
            Arc::new(HybridRetriever::new(index, config.retriever.clone())),
            agents,
            Arc::new(store),
        )
        .with_agent_timeout(config.agent_timeout))
    }

    /// Set the per-agent deadline
    pub fn with_agent_timeout(mut self, agent_timeout: Duration) -> Self {
        self.agent_timeout = agent_timeout;
        self
    }

    /// The session store
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// The intent router
    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    /// Handle one message and return the reply text
    pub async fn handle_turn(
        &self,
        session_id: &str,
        message: &str,
        explicit_edits: PreferenceUpdate,
    ) -> GraphResult<String> {
        self.handle_turn_detailed(session_id, message, explicit_edits)
            .await
            .map(|report| report.text)
    }

    /// Handle one message and report how the turn went
    pub async fn handle_turn_detailed(
        &self,
        session_id: &str,
        message: &str,
        explicit_edits: PreferenceUpdate,
    ) -> GraphResult<TurnReport> {
        let started = Instant::now();
        let mut phases = vec![TurnPhase::Idle];
        info!(session_id = %session_id, "Turn started");

        let turn = self.store.begin_turn(session_id).await?;

        phases.push(TurnPhase::RouterEvaluating);
        let turn_update = self.router.infer_preferences(message).merge(explicit_edits);
        let mut effective = SessionState::clone(turn.state());
        effective.preferences.apply(&turn_update);

        let activated: BTreeSet<AgentId> = self
            .router
            .classify(message, &effective)
            .into_iter()
            .filter(|id| self.agents.get(*id).is_some())
            .collect();
        if activated.is_empty() {
            return Err(GraphError::turn_failed(
                session_id,
                "no registered agent can handle the message",
            ));
        }
        debug!(session_id = %session_id, ?activated, "Agents selected");

        phases.push(TurnPhase::Retrieving);
        let contexts = self.retrieve_contexts(&activated, message, &effective).await;

        phases.push(TurnPhase::AgentsExecuting);
        let (results, degraded) = self
            .run_agents(&activated, message, &contexts, &effective)
            .await;

        if degraded.len() == activated.len() {
            warn!(
                session_id = %session_id,
                ?activated,
                "Every activated agent failed; session left unchanged"
            );
            return Err(GraphError::turn_failed(
                session_id,
                "all activated agents failed",
            ));
        }

        phases.push(TurnPhase::Synthesizing);
        let synthesis = self
            .synthesizer
            .combine(&results, &effective)
            .map_err(|e| GraphError::turn_failed(session_id, e.to_string()))?;

        let mut commit = TurnCommit::new()
            .with_preferences(turn_update.merge(synthesis.context_update.clone()))
            .with_turn(TurnRole::User, message);
        for result in results.values().filter(|r| !r.degraded) {
            commit = commit.with_turn(
                TurnRole::Agent(result.agent.display_name().to_string()),
                result.content.clone(),
            );
        }
        commit = commit.with_turn(TurnRole::Assistant, synthesis.text.clone());
        turn.commit(commit).await?;

        phases.push(TurnPhase::Idle);
        info!(
            session_id = %session_id,
            ?activated,
            ?degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Turn completed"
        );

        Ok(TurnReport {
            text: synthesis.text,
            activated,
            degraded,
            phases,
            grounded_ids: synthesis.grounded_ids,
        })
    }

    async fn retrieve_contexts(
        &self,
        activated: &BTreeSet<AgentId>,
        message: &str,
        session: &SessionState,
    ) -> BTreeMap<AgentId, RetrievalResult> {
        let lookups = activated.iter().filter_map(|id| {
            let agent = self.agents.get(*id)?;
            let plan = agent.retrieval_plan(message, session);
            let retriever = Arc::clone(&self.retriever);
            Some(async move {
                let mut result = retriever.retrieve(&plan.query, &plan.filters, plan.top_k).await;
                if plan.pin_named {
                    result = result.pinned(retriever.index().named_in(message), plan.top_k);
                }
                (*id, result)
            })
        });

        join_all(lookups).await.into_iter().collect()
    }

    async fn run_agents(
        &self,
        activated: &BTreeSet<AgentId>,
        message: &str,
        contexts: &BTreeMap<AgentId, RetrievalResult>,
        session: &SessionState,
    ) -> (BTreeMap<AgentId, AgentInvocationResult>, BTreeSet<AgentId>) {
        let empty = RetrievalResult::empty();
        let calls = activated.iter().filter_map(|id| {
            let agent = Arc::clone(self.agents.get(*id)?);
            let context = contexts.get(id).unwrap_or(&empty);
            let deadline = self.agent_timeout;
            Some(async move {
                let outcome = match timeout(deadline, agent.respond(message, context, session)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AgentError::Timeout {
                        agent: *id,
                        millis: deadline.as_millis() as u64,
                    }),
                };
                (*id, outcome)
            })
        });

        let mut results = BTreeMap::new();
        let mut degraded = BTreeSet::new();
        for (id, outcome) in join_all(calls).await {
            match outcome {
                Ok(result) => {
                    results.insert(id, result);
                }
                Err(err) => {
                    warn!(agent = %id, error = %err, "Agent failed; using degraded placeholder");
                    degraded.insert(id);
                    results.insert(id, AgentInvocationResult::degraded(id));
                }
            }
        }
        (results, degraded)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("agents", &self.agents)
            .field("agent_timeout", &self.agent_timeout)
            .field("store", &self.store)
            .finish()
    }
}
