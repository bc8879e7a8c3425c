//! User preferences and the non-destructive update rule

use crate::catalog::{CatalogFilters, PriceRange, SkillLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Preferences a customer has declared or implied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Budget bounds
    pub budget: Option<PriceRange>,

    /// Playing experience
    pub skill_level: Option<SkillLevel>,

    /// Preferred genres, lowercase
    #[serde(default)]
    pub genres: BTreeSet<String>,
}

impl UserPreferences {
    /// Apply an update; absent or empty values leave existing ones intact
    pub fn apply(&mut self, update: &PreferenceUpdate) {
        if let Some(budget) = update.budget.filter(|b| !b.is_unbounded()) {
            self.budget = Some(budget);
        }
        if let Some(level) = update.skill_level {
            self.skill_level = Some(level);
        }
        if let Some(genres) = update.genres.as_ref().filter(|g| !g.is_empty()) {
            self.genres = genres.clone();
        }
    }

    /// A copy with `update` applied
    pub fn merged(&self, update: &PreferenceUpdate) -> Self {
        let mut merged = self.clone();
        merged.apply(update);
        merged
    }

    /// Whether nothing has been declared
    pub fn is_empty(&self) -> bool {
        self.budget.is_none() && self.skill_level.is_none() && self.genres.is_empty()
    }

    /// Catalog filters equivalent to these preferences
    pub fn to_filters(&self) -> CatalogFilters {
        let mut filters = CatalogFilters::none();
        if let Some(level) = self.skill_level {
            filters = filters.with_skill_level(level);
        }
        if let Some(budget) = self.budget {
            filters = filters.with_price(budget);
        }
        for genre in &self.genres {
            filters = filters.with_genre(genre);
        }
        filters
    }

    /// Bullet summary for prompts
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        if let Some(budget) = &self.budget {
            lines.push(format!("- Budget: {budget}"));
        }
        if let Some(level) = &self.skill_level {
            lines.push(format!("- Skill Level: {level}"));
        }
        if !self.genres.is_empty() {
            let genres: Vec<&str> = self.genres.iter().map(String::as_str).collect();
            lines.push(format!("- Music Style: {}", genres.join(", ")));
        }

        if lines.is_empty() {
            "No specific preferences provided".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// A partial preference change; `None` means "no new value"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    /// New budget
    pub budget: Option<PriceRange>,

    /// New skill level
    pub skill_level: Option<SkillLevel>,

    /// New genre set
    pub genres: Option<BTreeSet<String>>,
}

impl PreferenceUpdate {
    /// An update that changes nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the budget
    pub fn with_budget(mut self, budget: PriceRange) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Set the skill level
    pub fn with_skill_level(mut self, level: SkillLevel) -> Self {
        self.skill_level = Some(level);
        self
    }

    /// Add a genre
    pub fn with_genre(mut self, genre: impl AsRef<str>) -> Self {
        let genre = genre.as_ref().trim().to_lowercase();
        if !genre.is_empty() {
            self.genres.get_or_insert_with(BTreeSet::new).insert(genre);
        }
        self
    }

    /// Whether applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        self.budget.map_or(true, |b| b.is_unbounded())
            && self.skill_level.is_none()
            && self.genres.as_ref().map_or(true, |g| g.is_empty())
    }

    /// Combine two updates; values present in `later` win
    pub fn merge(self, later: PreferenceUpdate) -> Self {
        Self {
            budget: later.budget.filter(|b| !b.is_unbounded()).or(self.budget),
            skill_level: later.skill_level.or(self.skill_level),
            genres: later.genres.filter(|g| !g.is_empty()).or(self.genres),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_is_non_destructive() {
        let mut prefs = UserPreferences {
            budget: Some(PriceRange::up_to(500.0)),
            ..Default::default()
        };

        prefs.apply(&PreferenceUpdate::none().with_skill_level(SkillLevel::Beginner));

        assert_eq!(
            prefs,
            UserPreferences {
                budget: Some(PriceRange::up_to(500.0)),
                skill_level: Some(SkillLevel::Beginner),
                genres: BTreeSet::new(),
            }
        );
    }

    #[test]
    fn test_empty_values_never_erase() {
        let mut prefs = UserPreferences::default()
            .merged(&PreferenceUpdate::none().with_budget(PriceRange::up_to(300.0)).with_genre("rock"));

        prefs.apply(&PreferenceUpdate {
            budget: Some(PriceRange::default()),
            skill_level: None,
            genres: Some(BTreeSet::new()),
        });

        assert_eq!(prefs.budget, Some(PriceRange::up_to(300.0)));
        assert!(prefs.genres.contains("rock"));
    }

    #[test]
    fn test_merge_prefers_later_values() {
        let earlier = PreferenceUpdate::none()
            .with_budget(PriceRange::up_to(800.0))
            .with_skill_level(SkillLevel::Intermediate);
        let later = PreferenceUpdate::none().with_budget(PriceRange::up_to(300.0));

        let merged = earlier.merge(later);
        assert_eq!(merged.budget, Some(PriceRange::up_to(300.0)));
        assert_eq!(merged.skill_level, Some(SkillLevel::Intermediate));
        assert!(PreferenceUpdate::none().is_empty());
    }

    #[test]
    fn test_preferences_become_filters() {
        let prefs = UserPreferences::default().merged(
            &PreferenceUpdate::none()
                .with_skill_level(SkillLevel::Beginner)
                .with_budget(PriceRange::up_to(300.0))
                .with_genre("Rock"),
        );

        let filters = prefs.to_filters();
        assert_eq!(filters.skill_level, Some(SkillLevel::Beginner));
        assert_eq!(filters.price, Some(PriceRange::up_to(300.0)));
        assert!(filters.genres.contains("rock"));
        assert!(prefs.describe().contains("- Budget: up to $300"));
    }
}
