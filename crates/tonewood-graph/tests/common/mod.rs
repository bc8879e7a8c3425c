#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonewood_graph::{
    AgentSet, AgentSettings, DiscountPolicy, DiscountTable, InformationAgent, IntentRouter,
    NegotiationAgent, Orchestrator, RecommendationAgent, RouterConfig,
};
use tonewood_llm::{GenerationRequest, Generator, LlmError, LlmResult};
use tonewood_rag::{
    CatalogIndex, CatalogRecord, ContextStore, HybridRetriever, RetrieverConfig, SkillLevel,
};

pub const INFO_TEXT: &str = "INFO: scale length and pickups explained.";
pub const REC_TEXT: &str = "REC: these fit a beginner rock player.";
pub const NEG_TEXT: &str = "NEG: here is the best deal we have.";

pub fn catalog_records() -> Vec<CatalogRecord> {
    vec![
        CatalogRecord::new("G-001", "Starter Strat", "Fender", "Electric Guitar", 279.0, SkillLevel::Beginner)
            .with_genres(["rock", "blues"])
            .with_description("Light double-cut body with three single-coil pickups and a 25.5 inch scale length.")
            .with_discount(10.0),
        CatalogRecord::new("G-002", "Les Paul Studio", "Gibson", "Electric Guitar", 1499.0, SkillLevel::Professional)
            .with_genres(["rock", "metal"])
            .with_description("Mahogany body, maple top, and twin humbuckers for thick sustain."),
        CatalogRecord::new("G-003", "Pacifica 112V", "Yamaha", "Electric Guitar", 299.0, SkillLevel::Beginner)
            .with_genres(["rock", "pop"])
            .with_description("Alder body with an HSS pickup layout and a comfortable neck."),
        CatalogRecord::new("G-004", "FG800 Dreadnought", "Yamaha", "Acoustic Guitar", 219.0, SkillLevel::Beginner)
            .with_genres(["folk", "country"])
            .with_description("Solid spruce top dreadnought with a warm, balanced voice."),
        CatalogRecord::new("G-005", "Player Telecaster", "Fender", "Electric Guitar", 849.0, SkillLevel::Intermediate)
            .with_genres(["country", "rock"])
            .with_description("Ash body with two single-coil pickups and a bright, cutting tone."),
        CatalogRecord::new("G-006", "Classic Vibe Jazzmaster", "Squier", "Electric Guitar", 429.0, SkillLevel::Intermediate)
            .with_genres(["jazz", "indie"])
            .with_description("Offset body, floating tremolo, and wide single-coil pickups."),
    ]
}

pub fn catalog_index() -> Arc<CatalogIndex> {
    Arc::new(CatalogIndex::load(catalog_records()).unwrap())
}

pub fn discount_table() -> DiscountTable {
    DiscountTable::new(vec![DiscountPolicy::new("acoustic-starter", "Acoustic Starter Pack", 5.0)
        .with_skill_level(SkillLevel::Beginner)
        .with_category("Acoustic Guitar")])
    .unwrap()
}

/// Returns a fixed reply and records every request it receives
pub struct ScriptedGenerator {
    reply: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<String> {
        self.requests.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Always fails like an exhausted quota
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _request: GenerationRequest) -> LlmResult<String> {
        Err(LlmError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Never answers within any reasonable deadline
pub struct HangingGenerator;

#[async_trait]
impl Generator for HangingGenerator {
    async fn generate(&self, _request: GenerationRequest) -> LlmResult<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

pub struct Generators {
    pub information: Arc<dyn Generator>,
    pub recommendation: Arc<dyn Generator>,
    pub negotiation: Arc<dyn Generator>,
}

impl Generators {
    pub fn scripted() -> Self {
        Self {
            information: ScriptedGenerator::new(INFO_TEXT),
            recommendation: ScriptedGenerator::new(REC_TEXT),
            negotiation: ScriptedGenerator::new(NEG_TEXT),
        }
    }

    pub fn failing() -> Self {
        Self {
            information: Arc::new(FailingGenerator),
            recommendation: Arc::new(FailingGenerator),
            negotiation: Arc::new(FailingGenerator),
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tonewood_graph=debug,tonewood_rag=debug")
        .with_test_writer()
        .try_init();
}

pub fn orchestrator(generators: Generators, store: Arc<ContextStore>) -> Orchestrator {
    init_tracing();
    let settings = AgentSettings::default();
    let agents = AgentSet::new()
        .with_agent(Arc::new(InformationAgent::new(generators.information, settings.clone())))
        .with_agent(Arc::new(RecommendationAgent::new(
            generators.recommendation,
            settings.clone(),
        )))
        .with_agent(Arc::new(NegotiationAgent::new(
            generators.negotiation,
            settings,
            discount_table(),
        )));

    Orchestrator::new(
        IntentRouter::new(RouterConfig::default()).unwrap(),
        Arc::new(HybridRetriever::new(catalog_index(), RetrieverConfig::default())),
        agents,
        store,
    )
    .with_agent_timeout(Duration::from_millis(200))
}
