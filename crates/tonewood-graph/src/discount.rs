//! Discount policy table and cited offers

use crate::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tonewood_rag::{CatalogRecord, SkillLevel};

/// Which products a policy applies to; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountScope {
    /// Required skill level
    pub skill_level: Option<SkillLevel>,

    /// Required category, compared case-insensitively
    pub category: Option<String>,

    /// Minimum list price
    pub min_price: Option<f64>,
}

impl DiscountScope {
    /// Whether a record falls inside this scope
    pub fn matches(&self, record: &CatalogRecord) -> bool {
        self.skill_level.map_or(true, |level| record.skill_level == level)
            && self
                .category
                .as_deref()
                .map_or(true, |c| record.category.eq_ignore_ascii_case(c))
            && self.min_price.map_or(true, |min| record.price >= min)
    }
}

/// A configured store-wide discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Stable identifier used in citations
    pub id: String,

    /// Customer-facing name
    pub name: String,

    /// Percentage off list price
    pub percent: f64,

    /// Products covered
    #[serde(default)]
    pub scope: DiscountScope,
}

impl DiscountPolicy {
    /// Create a policy covering every product
    pub fn new(id: impl Into<String>, name: impl Into<String>, percent: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            percent,
            scope: DiscountScope::default(),
        }
    }

    /// Restrict to a skill level
    pub fn with_skill_level(mut self, level: SkillLevel) -> Self {
        self.scope.skill_level = Some(level);
        self
    }

    /// Restrict to a category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.scope.category = Some(category.into());
        self
    }

    /// Restrict to products at or above a price
    pub fn with_min_price(mut self, min_price: f64) -> Self {
        self.scope.min_price = Some(min_price);
        self
    }
}

/// Where an offered discount comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiscountSource {
    /// The record's own catalog discount
    Catalog {
        /// Record carrying the discount
        record_id: String,
    },
    /// A configured policy
    Policy {
        /// Policy identifier
        policy_id: String,
        /// Policy name
        name: String,
    },
}

impl DiscountSource {
    /// Citation string, `catalog:<id>` or `policy:<id>`
    pub fn citation(&self) -> String {
        match self {
            DiscountSource::Catalog { record_id } => format!("catalog:{record_id}"),
            DiscountSource::Policy { policy_id, .. } => format!("policy:{policy_id}"),
        }
    }
}

/// A discount proposed for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountOffer {
    /// Discounted product
    pub record_id: String,

    /// Product name
    pub product_name: String,

    /// List price
    pub list_price: f64,

    /// Percentage off
    pub percent: f64,

    /// Price after discount, rounded to cents
    pub final_price: f64,

    /// Origin of the percentage
    pub source: DiscountSource,
}

impl fmt::Display for DiscountOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}% off -> ${:.2} (was ${:.2}; {})",
            self.record_id,
            format_percent(self.percent),
            self.final_price,
            self.list_price,
            self.source.citation()
        )
    }
}

/// Policies consulted when a record has no catalog discount
#[derive(Debug, Clone, Default)]
pub struct DiscountTable {
    policies: Vec<DiscountPolicy>,
}

impl DiscountTable {
    /// Build a table, rejecting duplicate ids and percentages outside (0, 100)
    pub fn new(policies: Vec<DiscountPolicy>) -> GraphResult<Self> {
        let mut seen = HashSet::new();
        for policy in &policies {
            if !(policy.percent > 0.0 && policy.percent < 100.0) {
                return Err(GraphError::configuration(format!(
                    "discount policy '{}' has invalid percent {}",
                    policy.id, policy.percent
                )));
            }
            if !seen.insert(policy.id.as_str()) {
                return Err(GraphError::configuration(format!(
                    "duplicate discount policy id '{}'",
                    policy.id
                )));
            }
        }
        Ok(Self { policies })
    }

    /// Configured policies in priority order
    pub fn policies(&self) -> &[DiscountPolicy] {
        &self.policies
    }

    /// The discount that applies to a record, if any
    ///
    /// A positive catalog discount wins; otherwise the first matching policy.
    pub fn offer_for(&self, record: &CatalogRecord) -> Option<DiscountOffer> {
        let (percent, source) = match record.discount_percent.filter(|p| *p > 0.0 && *p < 100.0) {
            Some(percent) => (
                percent,
                DiscountSource::Catalog {
                    record_id: record.id.clone(),
                },
            ),
            None => {
                let policy = self.policies.iter().find(|p| p.scope.matches(record))?;
                (
                    policy.percent,
                    DiscountSource::Policy {
                        policy_id: policy.id.clone(),
                        name: policy.name.clone(),
                    },
                )
            }
        };

        Some(DiscountOffer {
            record_id: record.id.clone(),
            product_name: record.name.clone(),
            list_price: record.price,
            percent,
            final_price: discounted_price(record.price, percent),
            source,
        })
    }
}

fn discounted_price(price: f64, percent: f64) -> f64 {
    (price * (1.0 - percent / 100.0) * 100.0).round() / 100.0
}

fn format_percent(percent: f64) -> String {
    if percent.fract() == 0.0 {
        format!("{percent:.0}")
    } else {
        format!("{percent:.1}")
    }
}
