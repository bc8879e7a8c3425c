//! # Tonewood LLM
//!
//! Thin client for the generation and embedding backends the assistant talks to.
//!
//! Agents only ever see the [`Generator`] trait, so any backend (an
//! OpenAI-compatible HTTP endpoint, a local model, a scripted test double) can
//! sit behind them. [`Client`] is the bundled HTTP implementation and also
//! exposes an embeddings call for the vector retrieval path.
//!
//! ```rust,no_run
//! use tonewood_llm::{ChatMessage, Client, GenerationRequest, Generator};
//!
//! # async fn example() -> tonewood_llm::LlmResult<()> {
//! let client = Client::from_env()?;
//! let request = GenerationRequest::new("You are a friendly guitar shop assistant.")
//!     .with_message(ChatMessage::user("What is a humbucker?"));
//! let text = client.generate(request).await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod generator;
mod message;

pub use client::{ChatResponse, Client};
pub use config::ClientConfig;
pub use error::{LlmError, LlmResult};
pub use generator::{GenerationRequest, Generator};
pub use message::{ChatMessage, MessageRole};
