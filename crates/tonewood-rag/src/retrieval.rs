//! # Hybrid Retrieval
//!
//! Vector search first, keyword search whenever the vector path cannot serve.
//!
//! The fallback decision is made per call with no shared retry state. Callers
//! only learn which path answered through [`MatchKind`] on each hit.

use crate::catalog::{CatalogFilters, CatalogIndex, CatalogRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Which retrieval path produced a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Dense similarity search
    Vector,
    /// Keyword overlap search
    Keyword,
}

/// One ranked catalog hit
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The matched record
    pub record: Arc<CatalogRecord>,

    /// Relevance score, higher is better
    pub score: f32,

    /// Path that produced the hit
    pub match_kind: MatchKind,
}

/// Ordered retrieval hits
///
/// Sorted by descending score, ties broken by ascending identifier. An empty
/// result means no product matched; it is not an error.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    hits: Vec<ScoredRecord>,
}

impl RetrievalResult {
    /// A result with no hits
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sort hits deterministically and keep the best `top_k`
    pub fn ranked(mut hits: Vec<ScoredRecord>, top_k: usize) -> Self {
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        hits.truncate(top_k);
        Self { hits }
    }

    /// Put `records` at the top with full keyword score, keeping `top_k`
    pub fn pinned(self, records: Vec<Arc<CatalogRecord>>, top_k: usize) -> Self {
        if records.is_empty() {
            return self;
        }
        let mut hits: Vec<ScoredRecord> = self
            .hits
            .into_iter()
            .filter(|hit| !records.iter().any(|r| r.id == hit.record.id))
            .collect();
        hits.extend(records.into_iter().map(|record| ScoredRecord {
            record,
            score: 1.0,
            match_kind: MatchKind::Keyword,
        }));
        Self::ranked(hits, top_k)
    }

    /// Ranked hits
    pub fn hits(&self) -> &[ScoredRecord] {
        &self.hits
    }

    /// Number of hits
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Identifiers in rank order
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.record.id.as_str()).collect()
    }

    /// Records in rank order
    pub fn records(&self) -> impl Iterator<Item = &Arc<CatalogRecord>> {
        self.hits.iter().map(|h| &h.record)
    }

    /// Keep only hits whose record passes `keep`, preserving order
    pub fn retain(mut self, keep: impl Fn(&CatalogRecord) -> bool) -> Self {
        self.hits.retain(|h| keep(&h.record));
        self
    }

    /// Keep at most the first `top_k` hits
    pub fn truncated(mut self, top_k: usize) -> Self {
        self.hits.truncate(top_k);
        self
    }

    /// Render hits as numbered catalog excerpts for a prompt
    pub fn to_prompt_context(&self) -> String {
        if self.hits.is_empty() {
            return "No relevant information found in the catalog.".to_string();
        }

        let entries: Vec<String> = self
            .hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let record = &hit.record;
                let mut entry = format!(
                    "--- CATALOG ENTRY {} ---\nId: {}\nName: {}\nBrand: {}\nCategory: {}\nPrice: ${:.2}\nSkill Level: {}",
                    i + 1,
                    record.id,
                    record.name,
                    record.brand,
                    record.category,
                    record.price,
                    record.skill_level
                );
                if !record.genres.is_empty() {
                    let genres: Vec<&str> = record.genres.iter().map(String::as_str).collect();
                    entry.push_str(&format!("\nGenres: {}", genres.join(", ")));
                }
                if !record.description.is_empty() {
                    entry.push_str(&format!("\nDescription: {}", record.description));
                }
                entry
            })
            .collect();

        format!("Catalog Excerpts:\n{}", entries.join("\n\n"))
    }
}

/// Retriever settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Default number of hits per query
    pub top_k: usize,

    /// Deadline for the vector path, embedding call included
    #[serde(with = "millis")]
    pub vector_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            vector_timeout: Duration::from_secs(2),
        }
    }
}

impl RetrieverConfig {
    /// Set the default hit count
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the vector path deadline
    pub fn with_vector_timeout(mut self, timeout: Duration) -> Self {
        self.vector_timeout = timeout;
        self
    }
}

/// Vector-first retriever with keyword fallback over the same index
#[derive(Clone)]
pub struct HybridRetriever {
    index: Arc<CatalogIndex>,
    config: RetrieverConfig,
}

impl HybridRetriever {
    /// Create a retriever over an index
    pub fn new(index: Arc<CatalogIndex>, config: RetrieverConfig) -> Self {
        Self { index, config }
    }

    /// The underlying index
    pub fn index(&self) -> &Arc<CatalogIndex> {
        &self.index
    }

    /// Retriever settings
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve at most `top_k` hits for `query` under `filters`
    ///
    /// Tries vector search; on any error, a timeout, or zero vector hits,
    /// runs keyword search with the same filters and `top_k`. Never fails:
    /// "nothing matched" is an empty result.
    pub async fn retrieve(
        &self,
        query: &str,
        filters: &CatalogFilters,
        top_k: usize,
    ) -> RetrievalResult {
        if top_k == 0 {
            return RetrievalResult::empty();
        }

        let vector = tokio::time::timeout(
            self.config.vector_timeout,
            self.index.vector_search(query, filters, top_k),
        )
        .await;

        match vector {
            Ok(Ok(result)) if !result.is_empty() => {
                debug!(query, hits = result.len(), "Served by vector search");
                return result;
            }
            Ok(Ok(_)) => {
                debug!(query, "Vector search found nothing, trying keyword search");
            }
            Ok(Err(e)) => {
                warn!(
                    query,
                    error = %e,
                    recoverable = e.is_fallback_trigger(),
                    "Vector search unavailable, falling back to keyword search"
                );
            }
            Err(_) => {
                warn!(
                    query,
                    timeout_ms = self.config.vector_timeout.as_millis() as u64,
                    "Vector search timed out, falling back to keyword search"
                );
            }
        }

        self.index.keyword_search(query, filters, top_k)
    }

    /// Retrieve with the configured default `top_k`
    pub async fn retrieve_default(&self, query: &str, filters: &CatalogFilters) -> RetrievalResult {
        self.retrieve(query, filters, self.config.top_k).await
    }
}

/// Serde helpers storing a [`Duration`] as whole milliseconds
pub mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize as milliseconds
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    /// Deserialize from milliseconds
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
