mod common;

use common::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tonewood_graph::{
    Agent, AgentId, AgentSettings, GraphError, IntentRouter, RecommendationAgent, RouterConfig,
    TurnPhase,
};
use tonewood_rag::{
    CatalogFilters, CatalogIndex, ContextStore, HashedTermEmbeddingProvider, HybridRetriever,
    MatchKind, PreferenceUpdate, PriceRange, RetrieverConfig, SessionState, SkillLevel,
    TurnCommit, TurnRole,
};

const END_TO_END_QUERY: &str = "I want a beginner guitar for rock music, what's a good deal?";

fn section<'a>(text: &'a str, heading: &str) -> &'a str {
    let start = text.find(heading).unwrap_or(text.len());
    let rest = &text[start..];
    let end = rest[heading.len().min(rest.len())..]
        .find("\n### ")
        .map(|i| i + heading.len())
        .unwrap_or(rest.len());
    &rest[..end]
}

#[tokio::test]
async fn retrieval_is_bounded_sorted_and_deterministic() {
    let mut index = CatalogIndex::load(catalog_records()).unwrap();
    index
        .build_vector_index(Arc::new(HashedTermEmbeddingProvider::default()))
        .await
        .unwrap();
    let vector = HybridRetriever::new(Arc::new(index), RetrieverConfig::default());
    let keyword = HybridRetriever::new(catalog_index(), RetrieverConfig::default());

    let queries = ["fender", "rock guitar", "single-coil pickups", "G-004", "", "zzz"];
    for retriever in [&vector, &keyword] {
        for query in queries {
            for top_k in [0, 1, 3, 10] {
                let first = retriever.retrieve(query, &CatalogFilters::none(), top_k).await;
                let second = retriever.retrieve(query, &CatalogFilters::none(), top_k).await;

                assert!(first.len() <= top_k);
                assert_eq!(first.ids(), second.ids());
                assert!(first.hits().windows(2).all(|w| w[0].score >= w[1].score));
            }
        }
    }
}

#[tokio::test]
async fn keyword_fallback_finds_record_by_name() {
    let retriever = HybridRetriever::new(catalog_index(), RetrieverConfig::default());

    let result = retriever
        .retrieve("Pacifica", &CatalogFilters::none(), 5)
        .await;

    assert_eq!(result.ids().first().copied(), Some("G-003"));
    assert!(result.hits().iter().all(|h| h.match_kind == MatchKind::Keyword));
}

#[test]
fn router_is_total() {
    let router = IntentRouter::new(RouterConfig::default()).unwrap();
    let session = SessionState::default();

    let only_info: BTreeSet<AgentId> = [AgentId::Information].into_iter().collect();
    assert_eq!(router.classify("", &session), only_info);
    assert_eq!(router.classify("hmm", &session), only_info);

    let long = "a".repeat(10_000);
    for message in [
        "🎸🎸🎸",
        "price price price",
        "recommend me something",
        "\n\t",
        "what's the scale length of G-001?",
        long.as_str(),
    ] {
        assert!(!router.classify(message, &session).is_empty());
    }
}

#[tokio::test]
async fn preference_update_is_non_destructive() {
    let store = ContextStore::in_memory();
    store
        .update_preferences("s1", PreferenceUpdate::none().with_budget(PriceRange::up_to(500.0)))
        .await
        .unwrap();
    let state = store
        .update_preferences("s1", PreferenceUpdate::none().with_skill_level(SkillLevel::Beginner))
        .await
        .unwrap();

    assert_eq!(state.preferences.budget, Some(PriceRange::up_to(500.0)));
    assert_eq!(state.preferences.skill_level, Some(SkillLevel::Beginner));
    assert!(state.preferences.genres.is_empty());
}

#[tokio::test]
async fn one_failed_agent_degrades_the_turn() {
    let store = Arc::new(ContextStore::in_memory());
    let generators = Generators {
        recommendation: Arc::new(FailingGenerator),
        ..Generators::scripted()
    };
    let orchestrator = orchestrator(generators, Arc::clone(&store));

    let report = orchestrator
        .handle_turn_detailed("s1", END_TO_END_QUERY, PreferenceUpdate::none())
        .await
        .unwrap();

    assert_eq!(report.activated, AgentId::ALL.into_iter().collect::<BTreeSet<_>>());
    assert_eq!(report.degraded, [AgentId::Recommendation].into_iter().collect::<BTreeSet<_>>());

    let info = report.text.find(INFO_TEXT).unwrap();
    let neg = report.text.find(NEG_TEXT).unwrap();
    assert!(info < neg);
    assert!(!report.text.contains(REC_TEXT));
    assert!(report.text.contains("catalog:G-001"));
}

#[tokio::test]
async fn timed_out_agent_is_treated_as_failed() {
    let store = Arc::new(ContextStore::in_memory());
    let generators = Generators {
        negotiation: Arc::new(HangingGenerator),
        ..Generators::scripted()
    };
    let orchestrator = orchestrator(generators, store).with_agent_timeout(Duration::from_millis(50));

    let report = orchestrator
        .handle_turn_detailed("s1", END_TO_END_QUERY, PreferenceUpdate::none())
        .await
        .unwrap();

    assert_eq!(report.degraded, [AgentId::Negotiation].into_iter().collect::<BTreeSet<_>>());
    assert!(report.text.contains(INFO_TEXT));
    assert!(report.text.contains(REC_TEXT));
}

#[tokio::test]
async fn all_agents_failing_leaves_session_untouched() {
    let store = Arc::new(ContextStore::in_memory());
    store
        .begin_turn("s1")
        .await
        .unwrap()
        .commit(
            TurnCommit::new()
                .with_preferences(PreferenceUpdate::none().with_budget(PriceRange::up_to(500.0)))
                .with_turn(TurnRole::User, "hi")
                .with_turn(TurnRole::Assistant, "hello"),
        )
        .await
        .unwrap();
    let before = store.snapshot("s1").await.unwrap();

    let orchestrator = orchestrator(Generators::failing(), Arc::clone(&store));
    let err = orchestrator
        .handle_turn(
            "s1",
            END_TO_END_QUERY,
            PreferenceUpdate::none().with_skill_level(SkillLevel::Professional),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::TurnFailed { .. }));
    assert!(err.user_message().starts_with("Sorry"));
    assert_eq!(store.snapshot("s1").await.unwrap(), before);
}

#[tokio::test]
async fn failed_first_turn_creates_no_session() {
    let store = Arc::new(ContextStore::in_memory());
    let orchestrator = orchestrator(Generators::failing(), Arc::clone(&store));

    assert!(orchestrator
        .handle_turn("fresh", "tell me about pickups", PreferenceUpdate::none())
        .await
        .is_err());
    assert!(store.snapshot("fresh").await.unwrap().is_none());
}

#[tokio::test]
async fn cancelled_turn_commits_nothing() {
    let store = Arc::new(ContextStore::in_memory());
    store
        .update_preferences("s1", PreferenceUpdate::none().with_genre("jazz"))
        .await
        .unwrap();
    let before = store.snapshot("s1").await.unwrap();

    let hanging = orchestrator(
        Generators {
            information: Arc::new(HangingGenerator),
            recommendation: Arc::new(HangingGenerator),
            negotiation: Arc::new(HangingGenerator),
        },
        Arc::clone(&store),
    )
    .with_agent_timeout(Duration::from_secs(3600));

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        hanging.handle_turn("s1", END_TO_END_QUERY, PreferenceUpdate::none()),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(store.snapshot("s1").await.unwrap(), before);

    let next = orchestrator(Generators::scripted(), Arc::clone(&store));
    tokio_test::assert_ok!(
        next.handle_turn("s1", "tell me about pickups", PreferenceUpdate::none())
            .await
    );
}

#[tokio::test]
async fn end_to_end_beginner_rock_deal() {
    let store = Arc::new(ContextStore::in_memory());
    store
        .update_preferences("s1", PreferenceUpdate::none().with_budget(PriceRange::up_to(300.0)))
        .await
        .unwrap();
    let orchestrator = orchestrator(Generators::scripted(), Arc::clone(&store));

    let report = orchestrator
        .handle_turn_detailed("s1", END_TO_END_QUERY, PreferenceUpdate::none())
        .await
        .unwrap();

    assert_eq!(report.activated, AgentId::ALL.into_iter().collect::<BTreeSet<_>>());
    assert!(report.degraded.is_empty());
    assert_eq!(
        report.phases,
        vec![
            TurnPhase::Idle,
            TurnPhase::RouterEvaluating,
            TurnPhase::Retrieving,
            TurnPhase::AgentsExecuting,
            TurnPhase::Synthesizing,
            TurnPhase::Idle,
        ]
    );

    let recommendations = section(&report.text, "### ✨ Recommendations");
    let deals = section(&report.text, "### 💰 Pricing & Deals");
    assert!(recommendations.contains("[G-001]"));
    assert!(!recommendations.contains("[G-002]"));
    assert!(!recommendations.contains("[G-004]"));
    assert!(deals.contains("[G-001] 10% off -> $251.10"));
    assert!(deals.contains("catalog:G-001"));

    let info = report.text.find(INFO_TEXT).unwrap();
    let rec = report.text.find(REC_TEXT).unwrap();
    let neg = report.text.find(NEG_TEXT).unwrap();
    assert!(info < rec && rec < neg);

    let state = store.snapshot("s1").await.unwrap().unwrap();
    assert_eq!(state.preferences.budget, Some(PriceRange::up_to(300.0)));
    assert_eq!(state.preferences.skill_level, Some(SkillLevel::Beginner));
    assert!(state.preferences.genres.contains("rock"));
}

#[test]
fn recommendation_plan_filters_on_effective_preferences() {
    let router = IntentRouter::new(RouterConfig::default()).unwrap();
    let mut session = SessionState::default();
    session.preferences.budget = Some(PriceRange::up_to(300.0));
    session
        .preferences
        .apply(&router.infer_preferences(END_TO_END_QUERY));

    let agent = RecommendationAgent::new(ScriptedGenerator::new(REC_TEXT), AgentSettings::default());
    let plan = agent.retrieval_plan(END_TO_END_QUERY, &session);

    assert_eq!(plan.filters.skill_level, Some(SkillLevel::Beginner));
    assert_eq!(plan.filters.price, Some(PriceRange::up_to(300.0)));
    assert!(plan.filters.genres.contains("rock"));
}

#[tokio::test]
async fn history_is_recorded_and_fed_back_to_agents() {
    let store = Arc::new(ContextStore::in_memory());
    let info = ScriptedGenerator::new(INFO_TEXT);
    let generators = Generators {
        information: info.clone(),
        ..Generators::scripted()
    };
    let orchestrator = orchestrator(generators, Arc::clone(&store));

    orchestrator
        .handle_turn("s1", "tell me about pickups", PreferenceUpdate::none())
        .await
        .unwrap();
    orchestrator
        .handle_turn("s1", "and the scale length?", PreferenceUpdate::none())
        .await
        .unwrap();

    let state = store.snapshot("s1").await.unwrap().unwrap();
    let roles: Vec<&TurnRole> = state.history.turns().iter().map(|t| &t.role).collect();
    assert_eq!(roles[0], &TurnRole::User);
    assert_eq!(roles[1], &TurnRole::Agent("Information Agent".to_string()));
    assert_eq!(roles[2], &TurnRole::Assistant);

    let requests = info.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[1].messages.len(), 4);
}

#[tokio::test]
async fn negotiation_never_invents_a_discount() {
    let store = Arc::new(ContextStore::in_memory());
    let orchestrator = orchestrator(Generators::scripted(), store);

    let report = orchestrator
        .handle_turn_detailed(
            "s1",
            "what's the price of the Les Paul?",
            PreferenceUpdate::none(),
        )
        .await
        .unwrap();

    let deals = section(&report.text, "### 💰 Pricing & Deals");
    assert!(deals.contains("[G-002]"));
    assert!(deals.contains("No discounts apply"));
    for line in deals.lines().filter(|l| l.contains("% off")) {
        assert!(line.contains("(was $") && (line.contains("catalog:") || line.contains("policy:")));
        assert!(!line.starts_with("- [G-002]"));
    }
}

#[tokio::test]
async fn price_pushback_tightens_budget() {
    let store = Arc::new(ContextStore::in_memory());
    store
        .update_preferences(
            "s1",
            PreferenceUpdate::none()
                .with_budget(PriceRange::up_to(300.0))
                .with_skill_level(SkillLevel::Beginner)
                .with_genre("rock"),
        )
        .await
        .unwrap();
    let orchestrator = orchestrator(Generators::scripted(), Arc::clone(&store));

    orchestrator
        .handle_turn("s1", "That's too expensive, any deal on something cheaper?", PreferenceUpdate::none())
        .await
        .unwrap();

    let state = store.snapshot("s1").await.unwrap().unwrap();
    assert_eq!(state.preferences.budget, Some(PriceRange::up_to(251.1)));
}

#[tokio::test]
async fn explicit_edits_outrank_inferred_preferences() {
    let store = Arc::new(ContextStore::in_memory());
    let orchestrator = orchestrator(Generators::scripted(), Arc::clone(&store));

    orchestrator
        .handle_turn(
            "s1",
            "I'm a beginner, something under $300 please",
            PreferenceUpdate::none()
                .with_skill_level(SkillLevel::Intermediate)
                .with_budget(PriceRange::up_to(900.0)),
        )
        .await
        .unwrap();

    let state = store.snapshot("s1").await.unwrap().unwrap();
    assert_eq!(state.preferences.skill_level, Some(SkillLevel::Intermediate));
    assert_eq!(state.preferences.budget, Some(PriceRange::up_to(900.0)));
}

#[tokio::test]
async fn named_product_is_priced_outside_the_budget() {
    let store = Arc::new(ContextStore::in_memory());
    store
        .update_preferences("s1", PreferenceUpdate::none().with_budget(PriceRange::up_to(300.0)))
        .await
        .unwrap();
    let orchestrator = orchestrator(Generators::scripted(), Arc::clone(&store));

    let report = orchestrator
        .handle_turn_detailed("s1", "what's the price of the Les Paul?", PreferenceUpdate::none())
        .await
        .unwrap();

    assert!(report.activated.contains(&AgentId::Negotiation));
    let deals = section(&report.text, "### 💰 Pricing & Deals");
    assert!(deals.contains("[G-002]"));
    assert!(!deals.contains("don't have a product"));
}
