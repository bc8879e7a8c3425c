//! # Shop Assistant
//!
//! Interactive command-line front end for the Tonewood orchestrator.
//!
//! ## Run This Example
//!
//! ```bash
//! # against an OpenAI-compatible endpoint configured via TONEWOOD_LLM_* / .env
//! cargo run -p tonewood-demos --bin shop_assistant -- --config demos/data/assistant.toml
//!
//! # fully offline, with canned agent answers
//! cargo run -p tonewood-demos --bin shop_assistant -- --offline --budget 300 --skill beginner
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tonewood_graph::{AssistantConfig, Orchestrator};
use tonewood_llm::{Client, GenerationRequest, Generator, LlmResult};
use tonewood_rag::{
    generate_session_id, CatalogIndex, CatalogRecord, ClientEmbeddingProvider, EmbeddingProvider,
    HashedTermEmbeddingProvider, PreferenceUpdate, PriceRange, SkillLevel,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shop_assistant", about = "Chat with the Tonewood guitar shop assistant")]
struct Args {
    /// Catalog JSON file (array of records)
    #[arg(long, default_value = "demos/data/catalog.json")]
    catalog: PathBuf,

    /// Assistant TOML configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session identifier; a fresh one is generated when omitted
    #[arg(long)]
    session: Option<String>,

    /// Budget ceiling in dollars
    #[arg(long)]
    budget: Option<f64>,

    /// Skill level: beginner, intermediate, professional
    #[arg(long)]
    skill: Option<SkillLevel>,

    /// Preferred genre; repeat for several
    #[arg(long = "genre")]
    genres: Vec<String>,

    /// Use offline embeddings and canned answers instead of the HTTP backend
    #[arg(long)]
    offline: bool,
}

/// Answers with the catalog excerpt it was handed, no model involved
struct CannedGenerator;

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<String> {
        let excerpt = request
            .last_user_message()
            .and_then(|task| task.lines().find(|l| l.starts_with("Name: ")))
            .map(|line| line.trim_start_matches("Name: ").to_string());

        Ok(match excerpt {
            Some(name) => format!("The {name} is a good place to start."),
            None => "I couldn't find anything in the catalog for that.".to_string(),
        })
    }

    fn name(&self) -> &str {
        "canned"
    }
}

async fn load_catalog(path: &PathBuf) -> Result<Vec<CatalogRecord>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading catalog {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing catalog {}", path.display()))
}

fn explicit_edits(args: &Args) -> PreferenceUpdate {
    let mut update = PreferenceUpdate::none();
    if let Some(budget) = args.budget {
        update = update.with_budget(PriceRange::up_to(budget));
    }
    if let Some(level) = args.skill {
        update = update.with_skill_level(level);
    }
    for genre in &args.genres {
        update = update.with_genre(genre);
    }
    update
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = AssistantConfig::load(args.config.as_deref())?;

    let mut index = CatalogIndex::load(load_catalog(&args.catalog).await?)?;

    let (generator, embeddings): (Arc<dyn Generator>, Arc<dyn EmbeddingProvider>) = if args.offline {
        (
            Arc::new(CannedGenerator),
            Arc::new(HashedTermEmbeddingProvider::default()),
        )
    } else {
        let client = Client::from_env()?;
        (
            Arc::new(client.clone()),
            Arc::new(ClientEmbeddingProvider::new(client)),
        )
    };

    if let Err(e) = index.build_vector_index(embeddings).await {
        warn!(error = %e, "Vector index unavailable; answering from keyword search");
    }
    info!(records = index.len(), vector = index.has_vector_index(), "Catalog ready");

    let assistant = Orchestrator::from_config(&config, Arc::new(index), generator)?;

    let session_id = args.session.clone().unwrap_or_else(generate_session_id);
    info!(session_id = %session_id, "Starting session");
    let mut pending_edits = explicit_edits(&args);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Tonewood guitar shop. Ask away, or type 'quit' to leave.");
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "quit" | "exit") {
            break;
        }

        let edits = std::mem::take(&mut pending_edits);
        match assistant.handle_turn(&session_id, message, edits.clone()).await {
            Ok(reply) => println!("\n{reply}"),
            Err(e) => {
                warn!(error = %e, "Turn failed");
                println!("\n{}", e.user_message());
                pending_edits = edits;
            }
        }
    }

    if let Some(state) = assistant.store().snapshot(&session_id).await? {
        println!("\nYour preferences:\n{}", state.preferences.describe());
    }
    Ok(())
}
