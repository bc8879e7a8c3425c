//! # Product Catalog
//!
//! Immutable product records and the filters that restrict them before ranking.
//!
//! Records are produced once by a catalog loader and never mutated afterwards.
//! [`CatalogIndex`] owns them behind `Arc`s so retrieval results can hand out
//! cheap references.

mod index;
pub mod text;

pub use index::{CatalogIndex, FieldWeights};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Player experience a product is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    /// First instrument, learning the basics
    #[serde(alias = "Beginner")]
    Beginner,
    /// Comfortable player looking to step up
    #[serde(alias = "Intermediate")]
    Intermediate,
    /// Gigging, recording, or teaching
    #[serde(alias = "Professional", alias = "pro")]
    Professional,
}

impl SkillLevel {
    /// All levels in ascending order
    pub const ALL: [SkillLevel; 3] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Professional,
    ];

    /// Lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Professional => "professional",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Professional => "Professional",
        };
        f.write_str(label)
    }
}

impl FromStr for SkillLevel {
    type Err = crate::error::RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(SkillLevel::Beginner),
            "intermediate" => Ok(SkillLevel::Intermediate),
            "professional" | "pro" | "advanced" => Ok(SkillLevel::Professional),
            other => Err(crate::error::RagError::validation(
                "skill_level",
                "one of beginner, intermediate, professional",
                other,
            )),
        }
    }
}

/// Inclusive price bounds; a missing side is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Lower bound
    pub min: Option<f64>,

    /// Upper bound
    pub max: Option<f64>,
}

impl PriceRange {
    /// Prices at or below `max`
    pub fn up_to(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Prices at or above `min`
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Prices within `[min, max]`, bounds swapped if given backwards
    pub fn between(min: f64, max: f64) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: Some(lo),
            max: Some(hi),
        }
    }

    /// Whether neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Whether `price` falls inside the range
    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "${min:.0}-${max:.0}"),
            (None, Some(max)) => write!(f, "up to ${max:.0}"),
            (Some(min), None) => write!(f, "${min:.0} and up"),
            (None, None) => f.write_str("any price"),
        }
    }
}

/// A single product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique identifier
    pub id: String,

    /// Model name
    pub name: String,

    /// Manufacturer
    pub brand: String,

    /// Product category, e.g. "Electric Guitar"
    pub category: String,

    /// Price in USD
    pub price: f64,

    /// Target skill level
    pub skill_level: SkillLevel,

    /// Genre tags, lowercase
    #[serde(default)]
    pub genres: BTreeSet<String>,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Promotional discount carried by the catalog itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<f64>,

    /// Extra text to embed alongside the structured fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_text: Option<String>,
}

impl CatalogRecord {
    /// Create a record with the required fields
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        brand: impl Into<String>,
        category: impl Into<String>,
        price: f64,
        skill_level: SkillLevel,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            brand: brand.into(),
            category: category.into(),
            price,
            skill_level,
            genres: BTreeSet::new(),
            description: String::new(),
            discount_percent: None,
            embedding_text: None,
        }
    }

    /// Set genre tags
    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.genres = genres
            .into_iter()
            .map(|g| g.as_ref().trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set a catalog-level discount
    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    /// Set extra embeddable text
    pub fn with_embedding_text(mut self, text: impl Into<String>) -> Self {
        self.embedding_text = Some(text.into());
        self
    }

    /// Text handed to embedding backends
    pub fn embeddable_text(&self) -> String {
        let genres = self.genres.iter().cloned().collect::<Vec<_>>().join(" ");
        let mut text = format!(
            "{} {} {} {} {} {}",
            self.name, self.brand, self.category, self.skill_level, genres, self.description
        );
        if let Some(extra) = &self.embedding_text {
            text.push(' ');
            text.push_str(extra);
        }
        text
    }

    /// One-line description used when rendering replies
    pub fn summary_line(&self) -> String {
        let genres = if self.genres.is_empty() {
            String::new()
        } else {
            format!(" · {}", self.genres.iter().cloned().collect::<Vec<_>>().join(", "))
        };
        format!(
            "[{}] {} ({}, {}) - ${:.2} · {}{}",
            self.id, self.name, self.brand, self.category, self.price, self.skill_level, genres
        )
    }
}

/// Restrictions applied to candidates before ranking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilters {
    /// Required skill level
    pub skill_level: Option<SkillLevel>,

    /// Allowed price range
    pub price: Option<PriceRange>,

    /// Accepted genres; a record matches when it carries any of them
    pub genres: BTreeSet<String>,
}

impl CatalogFilters {
    /// No restrictions
    pub fn none() -> Self {
        Self::default()
    }

    /// Require a skill level
    pub fn with_skill_level(mut self, level: SkillLevel) -> Self {
        self.skill_level = Some(level);
        self
    }

    /// Restrict the price
    pub fn with_price(mut self, range: PriceRange) -> Self {
        self.price = Some(range);
        self
    }

    /// Accept a genre
    pub fn with_genre(mut self, genre: impl AsRef<str>) -> Self {
        let genre = genre.as_ref().trim().to_lowercase();
        if !genre.is_empty() {
            self.genres.insert(genre);
        }
        self
    }

    /// Whether no restriction is set
    pub fn is_empty(&self) -> bool {
        self.skill_level.is_none()
            && self.price.map_or(true, |p| p.is_unbounded())
            && self.genres.is_empty()
    }

    /// Whether a record satisfies every restriction
    pub fn matches(&self, record: &CatalogRecord) -> bool {
        if let Some(level) = self.skill_level {
            if record.skill_level != level {
                return false;
            }
        }

        if let Some(range) = &self.price {
            if !range.contains(record.price) {
                return false;
            }
        }

        self.genres.is_empty() || self.genres.iter().any(|g| record.genres.contains(g))
    }
}
