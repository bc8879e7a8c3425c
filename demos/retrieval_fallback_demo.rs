//! # Retrieval Fallback Demo
//!
//! Runs the same queries through a retriever with a working vector index,
//! one whose embedding backend is down, and one with no vector index at all,
//! printing which path served each hit.
//!
//! ```bash
//! RUST_LOG=tonewood_rag=debug cargo run -p tonewood-demos --bin retrieval_fallback_demo
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tonewood_rag::{
    CatalogFilters, CatalogIndex, CatalogRecord, Embedding, EmbeddingProvider,
    HashedTermEmbeddingProvider, HybridRetriever, RagError, RagResult, RetrieverConfig,
    SkillLevel,
};
use tracing_subscriber::EnvFilter;

/// Embeds normally until switched off, then fails every call
struct SwitchableProvider {
    inner: HashedTermEmbeddingProvider,
    online: AtomicBool,
}

#[async_trait]
impl EmbeddingProvider for SwitchableProvider {
    async fn embed(&self, text: &str) -> RagResult<Embedding> {
        if self.online.load(Ordering::SeqCst) {
            self.inner.embed(text).await
        } else {
            Err(RagError::embedding(self.model_name(), "connection refused"))
        }
    }

    fn model_name(&self) -> &str {
        "switchable"
    }

    fn dimensions(&self) -> Option<usize> {
        self.inner.dimensions()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let raw = tokio::fs::read_to_string("demos/data/catalog.json").await?;
    let records: Vec<CatalogRecord> = serde_json::from_str(&raw)?;

    let provider = Arc::new(SwitchableProvider {
        inner: HashedTermEmbeddingProvider::default(),
        online: AtomicBool::new(true),
    });
    let mut indexed = CatalogIndex::load(records.clone())?;
    indexed.build_vector_index(provider.clone()).await?;

    let with_vectors = HybridRetriever::new(Arc::new(indexed), RetrieverConfig::default());
    let keyword_only = HybridRetriever::new(Arc::new(CatalogIndex::load(records)?), RetrieverConfig::default());

    let beginner = CatalogFilters::none().with_skill_level(SkillLevel::Beginner);
    let queries = [
        ("single coil pickups", CatalogFilters::none()),
        ("rock guitar", beginner),
        ("Les Paul", CatalogFilters::none()),
    ];

    for (query, filters) in &queries {
        println!("\n=== {query} ===");

        provider.online.store(true, Ordering::SeqCst);
        print_hits("vector index", &with_vectors.retrieve(query, filters, 3).await);

        provider.online.store(false, Ordering::SeqCst);
        print_hits("embedding backend down", &with_vectors.retrieve(query, filters, 3).await);

        print_hits("no vector index", &keyword_only.retrieve(query, filters, 3).await);
    }

    Ok(())
}

fn print_hits(label: &str, result: &tonewood_rag::RetrievalResult) {
    println!("  {label}:");
    if result.is_empty() {
        println!("    (no matching product)");
    }
    for hit in result.hits() {
        println!(
            "    {:<6} {:.3} {:?}  {}",
            hit.record.id, hit.score, hit.match_kind, hit.record.name
        );
    }
}
