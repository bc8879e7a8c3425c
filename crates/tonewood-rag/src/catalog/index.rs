//! In-memory catalog index with keyword and optional vector lookup

use super::text;
use super::{CatalogFilters, CatalogRecord};
use crate::embedding::{Embedding, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::retrieval::{MatchKind, RetrievalResult, ScoredRecord};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-field weights for keyword scoring
///
/// A query term scores the weight of the best field it appears in; prefix
/// matches (both sides at least four characters) score half.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeights {
    /// Product name
    pub name: f32,
    /// Brand
    pub brand: f32,
    /// Category
    pub category: f32,
    /// Genre tags
    pub genres: f32,
    /// Skill level label
    pub skill_level: f32,
    /// Description and extra embeddable text
    pub description: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            name: 3.0,
            brand: 2.5,
            category: 2.0,
            genres: 1.5,
            skill_level: 1.5,
            description: 1.0,
        }
    }
}

impl FieldWeights {
    fn max(&self) -> f32 {
        [
            self.name,
            self.brand,
            self.category,
            self.genres,
            self.skill_level,
            self.description,
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }
}

struct FieldTerms {
    name: BTreeSet<String>,
    brand: BTreeSet<String>,
    category: BTreeSet<String>,
    genres: BTreeSet<String>,
    skill_level: BTreeSet<String>,
    description: BTreeSet<String>,
}

impl FieldTerms {
    fn from_record(record: &CatalogRecord) -> Self {
        let mut description = text::term_set(&record.description);
        if let Some(extra) = &record.embedding_text {
            description.extend(text::term_set(extra));
        }

        Self {
            name: text::term_set(&record.name),
            brand: text::term_set(&record.brand),
            category: text::term_set(&record.category),
            genres: record.genres.iter().flat_map(|g| text::term_set(g)).collect(),
            skill_level: text::term_set(record.skill_level.as_str()),
            description,
        }
    }

    fn fields<'a>(&'a self, weights: &FieldWeights) -> [(&'a BTreeSet<String>, f32); 6] {
        [
            (&self.name, weights.name),
            (&self.brand, weights.brand),
            (&self.category, weights.category),
            (&self.genres, weights.genres),
            (&self.skill_level, weights.skill_level),
            (&self.description, weights.description),
        ]
    }
}

struct IndexedRecord {
    record: Arc<CatalogRecord>,
    terms: FieldTerms,
    id_lower: String,
}

struct VectorBackend {
    provider: Arc<dyn EmbeddingProvider>,
    embeddings: Vec<Embedding>,
}

/// Normalized product records with keyword and vector lookup
///
/// Records are kept sorted by identifier so every scan is deterministic.
pub struct CatalogIndex {
    records: Vec<IndexedRecord>,
    by_id: HashMap<String, usize>,
    weights: FieldWeights,
    vectors: Option<VectorBackend>,
    min_vector_score: f32,
}

impl CatalogIndex {
    /// Build an index over the loader's records
    ///
    /// Fails on empty or duplicate identifiers and on negative or non-finite
    /// prices.
    pub fn load(records: Vec<CatalogRecord>) -> RagResult<Self> {
        let mut records = records;
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::with_capacity(records.len());
        let mut indexed = Vec::with_capacity(records.len());

        for (position, mut record) in records.into_iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(RagError::validation("id", "must not be empty", &record.name));
            }
            if !record.price.is_finite() || record.price < 0.0 {
                return Err(RagError::validation(
                    "price",
                    "must be a finite non-negative number",
                    format!("{} for {}", record.price, record.id),
                ));
            }
            if by_id.insert(record.id.clone(), position).is_some() {
                return Err(RagError::validation("id", "must be unique", &record.id));
            }

            record.genres = record
                .genres
                .iter()
                .map(|g| g.trim().to_lowercase())
                .filter(|g| !g.is_empty())
                .collect();

            indexed.push(IndexedRecord {
                terms: FieldTerms::from_record(&record),
                id_lower: record.id.to_lowercase(),
                record: Arc::new(record),
            });
        }

        info!(records = indexed.len(), "Catalog index loaded");

        Ok(Self {
            records: indexed,
            by_id,
            weights: FieldWeights::default(),
            vectors: None,
            min_vector_score: 0.05,
        })
    }

    /// Override keyword field weights
    pub fn with_field_weights(mut self, weights: FieldWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Minimum cosine similarity a vector hit needs
    pub fn with_min_vector_score(mut self, score: f32) -> Self {
        self.min_vector_score = score;
        self
    }

    /// Embed every record and enable vector search
    ///
    /// On failure the index stays keyword-only.
    pub async fn build_vector_index(
        &mut self,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> RagResult<()> {
        let mut embeddings = Vec::with_capacity(self.records.len());
        for entry in &self.records {
            let embedding = provider.embed(&entry.record.embeddable_text()).await?;
            if let Some(first) = embeddings.first().map(|e: &Embedding| e.dimensions) {
                if first != embedding.dimensions {
                    return Err(RagError::embedding(
                        provider.model_name(),
                        format!(
                            "inconsistent dimensions: {} vs {}",
                            first, embedding.dimensions
                        ),
                    ));
                }
            }
            embeddings.push(embedding);
        }

        info!(
            model = provider.model_name(),
            records = embeddings.len(),
            "Vector index built"
        );

        self.vectors = Some(VectorBackend {
            provider,
            embeddings,
        });
        Ok(())
    }

    /// Whether vector search is available
    pub fn has_vector_index(&self) -> bool {
        self.vectors.is_some()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by identifier
    pub fn get(&self, id: &str) -> Option<&Arc<CatalogRecord>> {
        self.by_id.get(id).map(|&i| &self.records[i].record)
    }

    /// All records in identifier order
    pub fn records(&self) -> impl Iterator<Item = &Arc<CatalogRecord>> {
        self.records.iter().map(|r| &r.record)
    }

    /// Field-weighted token overlap search
    ///
    /// Score = sum over distinct query terms of the best matching field
    /// weight, divided by `max_weight * term_count`, so scores land in
    /// `(0, 1]`. A query naming a record identifier scores that record 1.0.
    pub fn keyword_search(
        &self,
        query: &str,
        filters: &CatalogFilters,
        top_k: usize,
    ) -> RetrievalResult {
        let query_terms = text::term_set(query);
        let raw_words: Vec<String> = query
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '?' | '!' | ';' | ':' | '(' | ')'))
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect();

        if query_terms.is_empty() && raw_words.is_empty() {
            return RetrievalResult::empty();
        }

        let denominator = self.weights.max() * query_terms.len().max(1) as f32;
        let hits = self
            .records
            .iter()
            .filter(|entry| filters.matches(&entry.record))
            .filter_map(|entry| {
                let score = if raw_words.iter().any(|w| *w == entry.id_lower) {
                    1.0
                } else {
                    let total: f32 = query_terms
                        .iter()
                        .map(|term| self.term_weight(term, &entry.terms))
                        .sum();
                    total / denominator
                };

                (score > 0.0).then(|| ScoredRecord {
                    record: entry.record.clone(),
                    score,
                    match_kind: MatchKind::Keyword,
                })
            })
            .collect();

        let result = RetrievalResult::ranked(hits, top_k);
        debug!(query, hits = result.len(), "Keyword search complete");
        result
    }

    /// Records the text names outright, ignoring filters
    ///
    /// A record is named when the text contains its identifier, or its first
    /// two name words (the whole name when shorter) as a phrase.
    pub fn named_in(&self, text: &str) -> Vec<Arc<CatalogRecord>> {
        let tokens = text::tokenize(text);
        self.records
            .iter()
            .filter(|entry| {
                let name = text::tokenize(&entry.record.name);
                let lead = name[..name.len().min(2)].join(" ");
                text::contains_phrase(&tokens, &entry.record.id)
                    || text::contains_phrase(&tokens, &lead)
            })
            .map(|entry| Arc::clone(&entry.record))
            .collect()
    }

    /// Dense similarity search
    ///
    /// Fails with [`RagError::IndexUnavailable`] when no vector index has been
    /// built, or with the provider's error when the query cannot be embedded.
    pub async fn vector_search(
        &self,
        query: &str,
        filters: &CatalogFilters,
        top_k: usize,
    ) -> RagResult<RetrievalResult> {
        let backend = self
            .vectors
            .as_ref()
            .ok_or_else(|| RagError::index_unavailable("no vector index built"))?;

        let query_embedding = backend.provider.embed(query).await?;

        let mut hits = Vec::new();
        for (entry, embedding) in self.records.iter().zip(&backend.embeddings) {
            if !filters.matches(&entry.record) {
                continue;
            }
            let score = query_embedding
                .cosine_similarity(embedding)
                .map_err(|e| RagError::embedding(backend.provider.model_name(), e.to_string()))?;
            if score >= self.min_vector_score && score > 0.0 {
                hits.push(ScoredRecord {
                    record: entry.record.clone(),
                    score,
                    match_kind: MatchKind::Vector,
                });
            }
        }

        let result = RetrievalResult::ranked(hits, top_k);
        debug!(query, hits = result.len(), "Vector search complete");
        Ok(result)
    }

    fn term_weight(&self, term: &str, fields: &FieldTerms) -> f32 {
        fields
            .fields(&self.weights)
            .iter()
            .map(|(terms, weight)| {
                if terms.contains(term) {
                    *weight
                } else if term.len() >= 4
                    && terms
                        .iter()
                        .any(|t| t.len() >= 4 && (t.starts_with(term) || term.starts_with(t.as_str())))
                {
                    weight * 0.5
                } else {
                    0.0
                }
            })
            .fold(0.0, f32::max)
    }
}
