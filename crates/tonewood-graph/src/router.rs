//! Intent routing and preference inference
//!
//! Routing is a total function from a message to a non-empty set of
//! [`AgentId`]s. Vocabulary rules are data; a message can activate several
//! agents at once, and a message nothing matches activates Information only.

use crate::agent::AgentId;
use crate::error::{GraphError, GraphResult};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tonewood_rag::catalog::text;
use tonewood_rag::{PreferenceUpdate, PriceRange, SessionState, SkillLevel};
use tracing::debug;

/// Phrases that activate one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRule {
    /// Agent to activate
    pub agent: AgentId,

    /// Lowercase phrases matched as whole-token runs
    pub phrases: Vec<String>,
}

impl IntentRule {
    /// Create a rule
    pub fn new<I, S>(agent: AgentId, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agent,
            phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, tokens: &[String]) -> usize {
        self.phrases
            .iter()
            .filter(|phrase| text::contains_phrase(tokens, phrase))
            .count()
    }
}

/// Router settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Add Information whenever another agent is activated
    pub ground_with_information: bool,

    /// Vocabulary rules
    pub rules: Vec<IntentRule>,

    /// Words that signal shopping intent when the customer has preferences on file
    pub shopping_cues: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            ground_with_information: true,
            rules: default_rules(),
            shopping_cues: ["want", "need", "looking", "interested", "get me", "find me"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RouterConfig {
    /// Toggle Information grounding
    pub fn with_ground_with_information(mut self, enabled: bool) -> Self {
        self.ground_with_information = enabled;
        self
    }
}

fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new(
            AgentId::Information,
            [
                "tell me", "explain", "what is", "what s", "how does", "difference", "spec",
                "specs", "specification", "specifications", "feature", "features", "scale length",
                "pickup", "pickups", "wood", "tonewood", "neck", "fret", "frets", "tone", "sound",
                "type", "types", "brand", "brands", "model", "models", "info", "information",
                "about", "show", "list", "available", "in stock",
            ],
        ),
        IntentRule::new(
            AgentId::Recommendation,
            [
                "recommend", "recommendation", "suggest", "suggestion", "best", "suitable",
                "good for", "which guitar", "what should", "should i", "help me choose", "pick",
                "looking for", "want to buy", "buying", "purchase", "buy", "compare", "vs",
                "versus", "better", "alternative", "alternatives",
            ],
        ),
        IntentRule::new(
            AgentId::Negotiation,
            [
                "price", "prices", "pricing", "cost", "costs", "expensive", "cheap", "cheaper",
                "discount", "discounts", "deal", "deals", "afford", "budget", "how much",
                "negotiate", "offer", "offers", "sale", "bundle", "coupon", "promotion",
            ],
        ),
    ]
}

const SKILL_VOCABULARY: &[(SkillLevel, &[&str])] = &[
    (
        SkillLevel::Beginner,
        &[
            "beginner", "beginners", "starter", "first guitar", "just started", "just starting",
            "new to", "novice", "learning to play", "learning guitar", "learner",
        ],
    ),
    (
        SkillLevel::Intermediate,
        &["intermediate", "some experience", "few years", "upgrade", "upgrading"],
    ),
    (
        SkillLevel::Professional,
        &[
            "professional", "i m a pro", "im a pro", "pro player", "advanced", "expert", "gigging",
            "touring",
        ],
    ),
];

const GENRES: &[&str] = &[
    "rock", "blues", "jazz", "metal", "country", "folk", "pop", "funk", "punk", "classical",
    "indie", "reggae", "grunge", "soul", "fusion", "flamenco", "bluegrass", "gospel",
];

const AMOUNT: &str = r"\$?\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?";

#[derive(Debug, Clone, Copy)]
enum BudgetShape {
    Between,
    Ceiling,
    Floor,
}

/// Budget phrasings, most specific first
fn budget_patterns() -> Vec<(BudgetShape, String)> {
    vec![
        (
            BudgetShape::Between,
            format!(r"(?i)\bbetween\s+{AMOUNT}\s*(?:and|to|-)\s*{AMOUNT}"),
        ),
        (
            BudgetShape::Between,
            format!(r"(?i)\$\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?\s*(?:to|-)\s*{AMOUNT}"),
        ),
        (
            BudgetShape::Ceiling,
            format!(
                r"(?i)\b(?:under|below|less than|up to|no more than|at most|max(?:imum)?(?:\s+of)?|budget(?:\s+(?:is|of|around|about))*|spend(?:\s+(?:around|about))?)\s*:?\s*{AMOUNT}"
            ),
        ),
        (
            BudgetShape::Floor,
            format!(r"(?i)\b(?:over|above|more than|at least|starting at)\s*{AMOUNT}"),
        ),
        (
            BudgetShape::Ceiling,
            r"(?i)\$\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?".to_string(),
        ),
    ]
}

/// Classifies messages into agent activations and extracts stated preferences
#[derive(Debug, Clone)]
pub struct IntentRouter {
    config: RouterConfig,
    budget_patterns: Vec<(BudgetShape, Regex)>,
}

impl IntentRouter {
    /// Build a router, compiling its budget patterns
    pub fn new(config: RouterConfig) -> GraphResult<Self> {
        let budget_patterns = budget_patterns()
            .into_iter()
            .map(|(shape, pattern)| Regex::new(&pattern).map(|re| (shape, re)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GraphError::configuration(format!("invalid budget pattern: {e}")))?;

        Ok(Self {
            config,
            budget_patterns,
        })
    }

    /// Router settings
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Phrase hits per agent
    pub fn signals(&self, message: &str) -> BTreeMap<AgentId, usize> {
        let tokens = text::tokenize(message);
        let mut signals = BTreeMap::new();
        for rule in &self.config.rules {
            let hits = rule.matches(&tokens);
            if hits > 0 {
                *signals.entry(rule.agent).or_insert(0) += hits;
            }
        }
        signals
    }

    /// Agents the message activates; never empty
    ///
    /// Recommendation also fires when the message itself states a
    /// preference, or carries a shopping cue while the session already
    /// holds preferences.
    pub fn classify(&self, message: &str, session: &SessionState) -> BTreeSet<AgentId> {
        let signals = self.signals(message);
        let mut active: BTreeSet<AgentId> = signals.keys().copied().collect();

        if !active.contains(&AgentId::Recommendation) {
            let tokens = text::tokenize(message);
            let states_preference = !self.infer_preferences(message).is_empty();
            let shopping_cue = self
                .config
                .shopping_cues
                .iter()
                .any(|cue| text::contains_phrase(&tokens, cue));

            if states_preference || (shopping_cue && !session.preferences.is_empty()) {
                active.insert(AgentId::Recommendation);
            }
        }

        if active.is_empty() || self.config.ground_with_information {
            active.insert(AgentId::Information);
        }

        debug!(?signals, ?active, "Message classified");
        active
    }

    /// Preferences stated in the message
    pub fn infer_preferences(&self, message: &str) -> PreferenceUpdate {
        let tokens = text::tokenize(message);
        let mut update = PreferenceUpdate::none();

        if let Some(level) = SKILL_VOCABULARY
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| text::contains_phrase(&tokens, p)))
            .map(|(level, _)| *level)
        {
            update = update.with_skill_level(level);
        }

        for genre in GENRES {
            if tokens.iter().any(|t| t == genre) {
                update = update.with_genre(genre);
            }
        }

        if let Some(budget) = self.infer_budget(message) {
            update = update.with_budget(budget);
        }

        update
    }

    fn infer_budget(&self, message: &str) -> Option<PriceRange> {
        self.budget_patterns.iter().find_map(|(shape, re)| {
            let caps = re.captures(message)?;
            let first = amount(&caps, 1, 2)?;
            match shape {
                BudgetShape::Between => Some(PriceRange::between(first, amount(&caps, 3, 4)?)),
                BudgetShape::Ceiling => Some(PriceRange::up_to(first)),
                BudgetShape::Floor => Some(PriceRange::at_least(first)),
            }
        })
    }
}

fn amount(caps: &Captures<'_>, value: usize, thousands: usize) -> Option<f64> {
    let raw = caps.get(value)?.as_str().replace(',', "");
    let mut amount: f64 = raw.parse().ok()?;
    if caps.get(thousands).is_some() {
        amount *= 1000.0;
    }
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> IntentRouter {
        IntentRouter::new(RouterConfig::default()).unwrap()
    }

    fn set(ids: &[AgentId]) -> BTreeSet<AgentId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_ambiguous_messages_route_to_information() {
        let router = router();
        let session = SessionState::default();
        for message in ["", "   ", "hello", "?!", "guitar"] {
            assert_eq!(router.classify(message, &session), set(&[AgentId::Information]));
        }
    }

    #[test]
    fn test_multi_agent_activation() {
        let router = router();
        let active = router.classify(
            "What's the scale length, which one should I buy, and can I get a discount?",
            &SessionState::default(),
        );
        assert_eq!(active, set(&AgentId::ALL));
    }

    #[test]
    fn test_information_accompanies_other_agents() {
        let router = router();
        let active = router.classify("can I get a discount", &SessionState::default());
        assert_eq!(active, set(&[AgentId::Information, AgentId::Negotiation]));

        let ungrounded =
            IntentRouter::new(RouterConfig::default().with_ground_with_information(false)).unwrap();
        assert_eq!(
            ungrounded.classify("can I get a discount", &SessionState::default()),
            set(&[AgentId::Negotiation])
        );
    }

    #[test]
    fn test_stated_preferences_activate_recommendation() {
        let router = router();
        let active = router.classify("I play jazz", &SessionState::default());
        assert!(active.contains(&AgentId::Recommendation));
    }

    #[test]
    fn test_shopping_cue_with_stored_preferences() {
        let router = router();
        let mut session = SessionState::default();
        assert!(!router
            .classify("I need one", &session)
            .contains(&AgentId::Recommendation));

        session.preferences.skill_level = Some(SkillLevel::Beginner);
        assert!(router
            .classify("I need one", &session)
            .contains(&AgentId::Recommendation));
    }

    #[test]
    fn test_single_words_do_not_set_skill() {
        let router = router();
        for message in [
            "I'm learning about pickups",
            "Does the Pro Junior come in black?",
            "what is a pro setup",
        ] {
            assert_eq!(router.infer_preferences(message).skill_level, None, "{message}");
        }

        let level = |m: &str| router.infer_preferences(m).skill_level;
        assert_eq!(level("I'm learning to play"), Some(SkillLevel::Beginner));
        assert_eq!(level("I'm a pro"), Some(SkillLevel::Professional));
        assert_eq!(level("gigging twice a week"), Some(SkillLevel::Professional));
    }

    #[test]
    fn test_infers_skill_and_genres() {
        let update = router().infer_preferences("I'm a beginner who loves rock and blues");
        assert_eq!(update.skill_level, Some(SkillLevel::Beginner));
        assert_eq!(
            update.genres,
            Some(["blues", "rock"].into_iter().map(String::from).collect())
        );
    }

    #[test]
    fn test_infers_budget_phrasings() {
        let router = router();
        let budget = |m: &str| router.infer_preferences(m).budget;

        assert_eq!(budget("something under $300"), Some(PriceRange::up_to(300.0)));
        assert_eq!(budget("my budget of 500"), Some(PriceRange::up_to(500.0)));
        assert_eq!(budget("budget is $1,200"), Some(PriceRange::up_to(1200.0)));
        assert_eq!(
            budget("between 200 and 400 dollars"),
            Some(PriceRange::between(200.0, 400.0))
        );
        assert_eq!(budget("$200-$400"), Some(PriceRange::between(200.0, 400.0)));
        assert_eq!(budget("around $300"), Some(PriceRange::up_to(300.0)));
        assert_eq!(budget("up to 1.5k"), Some(PriceRange::up_to(1500.0)));
        assert_eq!(budget("at least 800"), Some(PriceRange::at_least(800.0)));
        assert_eq!(budget("a 24 fret neck"), None);
    }
}
