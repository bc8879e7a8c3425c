//! Vector embeddings for the catalog's dense retrieval path
//!
//! Provides the embedding abstraction the vector path depends on, a
//! deterministic offline provider, and an adapter over the HTTP client.

use crate::catalog::text;
use crate::error::{RagError, RagResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A vector embedding (dense float vector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The vector dimensions
    pub vector: Vec<f32>,

    /// Dimensionality of the embedding
    pub dimensions: usize,

    /// Model used to generate the embedding
    pub model: String,
}

impl Embedding {
    /// Create a new embedding
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Self {
        let dimensions = vector.len();
        Self {
            vector,
            dimensions,
            model: model.into(),
        }
    }

    /// Calculate cosine similarity with another embedding
    pub fn cosine_similarity(&self, other: &Embedding) -> RagResult<f32> {
        if self.dimensions != other.dimensions {
            return Err(RagError::validation(
                "embedding_dimensions",
                "dimensions must match",
                format!("{} vs {}", self.dimensions, other.dimensions),
            ));
        }

        let dot_product: f32 = self
            .vector
            .iter()
            .zip(other.vector.iter())
            .map(|(a, b)| a * b)
            .sum();

        let norm_a: f32 = self.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.vector.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return Ok(0.0);
        }

        Ok(dot_product / (norm_a * norm_b))
    }
}

/// Trait for embedding generation backends
///
/// Any failure must surface as an error so the hybrid retriever can fall
/// back to keyword search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for the given text
    async fn embed(&self, text: &str) -> RagResult<Embedding>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimensions, if fixed
    fn dimensions(&self) -> Option<usize>;
}

/// Offline provider that hashes normalized terms into fixed buckets
///
/// Uses the same normalization as keyword search, so cosine similarity
/// tracks term overlap. Always available; no network involved.
pub struct HashedTermEmbeddingProvider {
    dimensions: usize,
}

impl HashedTermEmbeddingProvider {
    /// Create a provider with the given dimensionality
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// FNV-1a bucket for a term
    fn bucket(&self, term: &str) -> usize {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in term.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % self.dimensions as u64) as usize
    }

    fn hashed_vector(&self, input: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for term in text::term_set(input) {
            vector[self.bucket(&term)] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashedTermEmbeddingProvider {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl EmbeddingProvider for HashedTermEmbeddingProvider {
    async fn embed(&self, text: &str) -> RagResult<Embedding> {
        Ok(Embedding::new(self.hashed_vector(text), self.model_name()))
    }

    fn model_name(&self) -> &str {
        "hashed-term"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}

/// Embedding provider backed by the HTTP client's embeddings endpoint
#[cfg(feature = "llm-client")]
pub struct ClientEmbeddingProvider {
    client: tonewood_llm::Client,
}

#[cfg(feature = "llm-client")]
impl ClientEmbeddingProvider {
    /// Wrap a client
    pub fn new(client: tonewood_llm::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "llm-client")]
#[async_trait]
impl EmbeddingProvider for ClientEmbeddingProvider {
    async fn embed(&self, text: &str) -> RagResult<Embedding> {
        let vector = self
            .client
            .embed(text)
            .await
            .map_err(|e| RagError::embedding(self.model_name(), e.to_string()))?;
        Ok(Embedding::new(vector, self.model_name()))
    }

    fn model_name(&self) -> &str {
        &self.client.config().embedding_model
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }
}
