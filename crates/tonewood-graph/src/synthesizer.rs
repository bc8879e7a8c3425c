//! Combines agent answers into one reply

use crate::agent::{AgentId, AgentInvocationResult, AgentPayload};
use crate::error::{GraphError, GraphResult};
use std::collections::{BTreeMap, BTreeSet};
use tonewood_rag::{CatalogRecord, PreferenceUpdate, SessionState};
use tracing::debug;

/// The combined reply and the preference change to persist
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Final customer-facing text
    pub text: String,

    /// Preference change inferred by the agents
    pub context_update: PreferenceUpdate,

    /// Every catalog id the reply is grounded on
    pub grounded_ids: BTreeSet<String>,
}

/// Merges agent answers in Information, Recommendation, Negotiation order
///
/// Each product's summary is written once; later sections refer back to it.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer;

impl Synthesizer {
    /// Create a synthesizer
    pub fn new() -> Self {
        Self
    }

    /// Combine activated agents' results
    ///
    /// Degraded placeholders are skipped. Fails only when nothing usable is
    /// left to combine.
    pub fn combine(
        &self,
        results: &BTreeMap<AgentId, AgentInvocationResult>,
        session: &SessionState,
    ) -> GraphResult<Synthesis> {
        let usable: Vec<&AgentInvocationResult> =
            results.values().filter(|r| !r.degraded).collect();
        if usable.is_empty() {
            return Err(GraphError::synthesis("no agent produced a usable answer"));
        }

        let mut described = BTreeSet::new();
        let mut sections = Vec::with_capacity(usable.len());
        let mut update = PreferenceUpdate::none();

        for result in usable {
            sections.push(render_section(result, &mut described));
            update = update.merge(result.preference_delta.clone());
        }

        let context_update = effective_change(update, session);
        debug!(
            sections = sections.len(),
            grounded = described.len(),
            preference_change = !context_update.is_empty(),
            "Agent results synthesized"
        );

        Ok(Synthesis {
            text: sections.join("\n\n"),
            context_update,
            grounded_ids: described,
        })
    }
}

fn heading(agent: AgentId) -> (&'static str, &'static str) {
    match agent {
        AgentId::Information => ("### 📚 Guitar Info", "Catalog matches:"),
        AgentId::Recommendation => ("### ✨ Recommendations", "Top picks:"),
        AgentId::Negotiation => ("### 💰 Pricing & Deals", "Priced items:"),
    }
}

fn render_section(result: &AgentInvocationResult, described: &mut BTreeSet<String>) -> String {
    let (title, list_title) = heading(result.agent);
    let mut section = format!("{title}\n{}", result.content.trim());

    if !result.grounded.is_empty() {
        section.push_str("\n\n");
        section.push_str(list_title);
        for record in &result.grounded {
            section.push('\n');
            section.push_str(&product_line(record, described));
        }
    }

    if let Some(AgentPayload::Offers { offers }) = &result.payload {
        section.push_str("\n\nAvailable offers:");
        if offers.is_empty() {
            section.push_str("\n- No discounts apply to these items right now.");
        }
        for offer in offers {
            section.push_str(&format!("\n- {offer}"));
        }
    }

    section
}

fn product_line(record: &CatalogRecord, described: &mut BTreeSet<String>) -> String {
    if described.insert(record.id.clone()) {
        format!("- {}", record.summary_line())
    } else {
        format!("- [{}] {} (see above)", record.id, record.name)
    }
}

/// Drop parts of the update that would not change the session
fn effective_change(update: PreferenceUpdate, session: &SessionState) -> PreferenceUpdate {
    let current = &session.preferences;
    PreferenceUpdate {
        budget: update
            .budget
            .filter(|b| !b.is_unbounded() && current.budget != Some(*b)),
        skill_level: update.skill_level.filter(|l| current.skill_level != Some(*l)),
        genres: update
            .genres
            .filter(|g| !g.is_empty() && *g != current.genres),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::{DiscountOffer, DiscountSource};
    use std::sync::Arc;
    use tonewood_rag::{PriceRange, SkillLevel};

    fn record(id: &str, name: &str) -> Arc<CatalogRecord> {
        Arc::new(CatalogRecord::new(id, name, "Fender", "Electric Guitar", 279.0, SkillLevel::Beginner))
    }

    fn results(items: Vec<AgentInvocationResult>) -> BTreeMap<AgentId, AgentInvocationResult> {
        items.into_iter().map(|r| (r.agent, r)).collect()
    }

    #[test]
    fn test_sections_follow_fixed_order() {
        let synthesis = Synthesizer::new()
            .combine(
                &results(vec![
                    AgentInvocationResult::new(AgentId::Negotiation, "deal text"),
                    AgentInvocationResult::new(AgentId::Information, "info text"),
                    AgentInvocationResult::new(AgentId::Recommendation, "rec text"),
                ]),
                &SessionState::default(),
            )
            .unwrap();

        let info = synthesis.text.find("info text").unwrap();
        let rec = synthesis.text.find("rec text").unwrap();
        let deal = synthesis.text.find("deal text").unwrap();
        assert!(info < rec && rec < deal);
    }

    #[test]
    fn test_products_described_once() {
        let strat = record("G-001", "Starter Strat");
        let synthesis = Synthesizer::new()
            .combine(
                &results(vec![
                    AgentInvocationResult::new(AgentId::Information, "info")
                        .with_grounding([Arc::clone(&strat)]),
                    AgentInvocationResult::new(AgentId::Recommendation, "rec")
                        .with_grounding([Arc::clone(&strat)]),
                ]),
                &SessionState::default(),
            )
            .unwrap();

        assert_eq!(synthesis.text.matches(&strat.summary_line()).count(), 1);
        assert!(synthesis.text.contains("[G-001] Starter Strat (see above)"));
        assert_eq!(synthesis.grounded_ids.len(), 1);
    }

    #[test]
    fn test_degraded_results_are_skipped() {
        let synthesis = Synthesizer::new()
            .combine(
                &results(vec![
                    AgentInvocationResult::new(AgentId::Information, "info"),
                    AgentInvocationResult::degraded(AgentId::Recommendation),
                ]),
                &SessionState::default(),
            )
            .unwrap();
        assert!(!synthesis.text.contains("Recommendations"));

        let all_failed = results(vec![AgentInvocationResult::degraded(AgentId::Information)]);
        assert!(Synthesizer::new()
            .combine(&all_failed, &SessionState::default())
            .is_err());
    }

    #[test]
    fn test_offers_and_context_update() {
        let offer = DiscountOffer {
            record_id: "G-001".to_string(),
            product_name: "Starter Strat".to_string(),
            list_price: 279.0,
            percent: 10.0,
            final_price: 251.1,
            source: DiscountSource::Catalog {
                record_id: "G-001".to_string(),
            },
        };
        let mut session = SessionState::default();
        session.preferences.skill_level = Some(SkillLevel::Beginner);

        let synthesis = Synthesizer::new()
            .combine(
                &results(vec![AgentInvocationResult::new(AgentId::Negotiation, "deal")
                    .with_grounding([record("G-001", "Starter Strat")])
                    .with_payload(AgentPayload::Offers { offers: vec![offer] })
                    .with_preference_delta(
                        PreferenceUpdate::none()
                            .with_budget(PriceRange::up_to(251.1))
                            .with_skill_level(SkillLevel::Beginner),
                    )]),
                &session,
            )
            .unwrap();

        assert!(synthesis.text.contains("10% off -> $251.10"));
        assert!(synthesis.text.contains("catalog:G-001"));
        assert_eq!(synthesis.context_update.budget, Some(PriceRange::up_to(251.1)));
        assert_eq!(synthesis.context_update.skill_level, None);
    }
}
