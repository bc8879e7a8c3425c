use super::{
    build_request, preference_query, Agent, AgentId, AgentInvocationResult, AgentPayload,
    AgentSettings, RetrievalPlan,
};
use crate::discount::{DiscountOffer, DiscountTable};
use crate::error::AgentError;
use async_trait::async_trait;
use std::sync::Arc;
use tonewood_llm::Generator;
use tonewood_rag::catalog::text;
use tonewood_rag::{PreferenceUpdate, PriceRange, RetrievalResult, SessionState};
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a friendly salesperson at a guitar shop who talks about \
price and value. Quote prices only from the catalog entries you are given and mention only the \
discounts listed as available offers, together with their source. If no offer is listed, do not \
promise a discount; talk about value instead.";

const PRICE_SENSITIVE_PHRASES: &[&str] = &[
    "cheaper",
    "cheapest",
    "too expensive",
    "too much",
    "lower price",
    "less expensive",
    "pricey",
    "can t afford",
    "cannot afford",
];

/// Quotes prices and proposes discounts backed by catalog data or policy
pub struct NegotiationAgent {
    generator: Arc<dyn Generator>,
    settings: AgentSettings,
    discounts: DiscountTable,
    max_offers: usize,
    temperature: f32,
}

impl NegotiationAgent {
    /// Create the agent over a generation backend and discount table
    pub fn new(generator: Arc<dyn Generator>, settings: AgentSettings, discounts: DiscountTable) -> Self {
        Self {
            generator,
            settings,
            discounts,
            max_offers: 3,
            temperature: 0.8,
        }
    }

    /// Limit how many products are priced
    pub fn with_max_offers(mut self, max: usize) -> Self {
        self.max_offers = max.max(1);
        self
    }

    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

fn is_price_sensitive(message: &str) -> bool {
    let tokens = text::tokenize(message);
    PRICE_SENSITIVE_PHRASES
        .iter()
        .any(|phrase| text::contains_phrase(&tokens, phrase))
}

/// A tighter budget ceiling when the customer pushes back on price
fn tightened_budget(current: Option<PriceRange>, offers: &[DiscountOffer]) -> Option<PriceRange> {
    let lowest = offers
        .iter()
        .map(|o| o.final_price)
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))))?;

    let current = current.unwrap_or_default();
    if current.max.map_or(false, |max| lowest >= max) {
        return None;
    }
    Some(match current.min {
        Some(min) if min <= lowest => PriceRange::between(min, lowest),
        _ => PriceRange::up_to(lowest),
    })
}

#[async_trait]
impl Agent for NegotiationAgent {
    fn id(&self) -> AgentId {
        AgentId::Negotiation
    }

    fn retrieval_plan(&self, query: &str, session: &SessionState) -> RetrievalPlan {
        RetrievalPlan {
            query: preference_query(query, session),
            filters: session.preferences.to_filters(),
            top_k: self.settings.top_k,
            pin_named: true,
        }
    }

    async fn respond(
        &self,
        query: &str,
        context: &RetrievalResult,
        session: &SessionState,
    ) -> Result<AgentInvocationResult, AgentError> {
        let priced = context.clone().truncated(self.max_offers);
        if priced.is_empty() {
            return Ok(AgentInvocationResult::new(
                self.id(),
                "I don't have a product in our catalog to price for that request yet. \
                 Once we find the right guitar I can check what deals apply.",
            ));
        }

        let offers: Vec<DiscountOffer> = priced
            .records()
            .filter_map(|record| self.discounts.offer_for(record))
            .collect();

        let offer_lines = if offers.is_empty() {
            "None".to_string()
        } else {
            offers
                .iter()
                .map(|o| format!("- {o}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let task = format!(
            "Customer says: {query}\n\nCustomer budget: {}\n\n{}\n\nAvailable offers:\n{offer_lines}",
            session
                .preferences
                .budget
                .map_or_else(|| "not specified".to_string(), |b| b.to_string()),
            priced.to_prompt_context()
        );
        let request = build_request(SYSTEM_PROMPT, task, session, self.settings.history_window)
            .with_temperature(self.temperature);

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

        let mut delta = PreferenceUpdate::none();
        if is_price_sensitive(query) {
            if let Some(budget) = tightened_budget(session.preferences.budget, &offers) {
                debug!(%budget, "Budget tightened after price pushback");
                delta = delta.with_budget(budget);
            }
        }

        debug!(priced = priced.len(), offers = offers.len(), "Negotiation answer generated");
        Ok(AgentInvocationResult::new(self.id(), content)
            .with_grounding(priced.records().cloned())
            .with_payload(AgentPayload::Offers { offers })
            .with_preference_delta(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::DiscountSource;

    fn offer(final_price: f64) -> DiscountOffer {
        DiscountOffer {
            record_id: "G-1".to_string(),
            product_name: "Guitar".to_string(),
            list_price: final_price + 10.0,
            percent: 5.0,
            final_price,
            source: DiscountSource::Catalog {
                record_id: "G-1".to_string(),
            },
        }
    }

    #[test]
    fn test_price_sensitivity() {
        assert!(is_price_sensitive("That's too expensive for me"));
        assert!(is_price_sensitive("anything cheaper?"));
        assert!(!is_price_sensitive("tell me about the pickups"));
    }

    #[test]
    fn test_budget_only_ever_tightens() {
        let offers = [offer(250.0), offer(180.0)];
        assert_eq!(
            tightened_budget(Some(PriceRange::up_to(300.0)), &offers),
            Some(PriceRange::up_to(180.0))
        );
        assert_eq!(tightened_budget(Some(PriceRange::up_to(150.0)), &offers), None);
        assert_eq!(tightened_budget(None, &[]), None);
        assert_eq!(
            tightened_budget(Some(PriceRange::between(100.0, 300.0)), &offers),
            Some(PriceRange::between(100.0, 180.0))
        );
    }
}
