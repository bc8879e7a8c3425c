//! Client configuration

use crate::error::{LlmError, LlmResult};
use std::time::Duration;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Connection settings for an OpenAI-compatible backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: Url,

    /// Bearer token; optional for local backends
    pub api_key: Option<String>,

    /// Chat completion model
    pub chat_model: String,

    /// Embedding model
    pub embedding_model: String,

    /// Default sampling temperature
    pub temperature: f32,

    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given base URL with defaults elsewhere
    pub fn new(base_url: &str) -> LlmResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LlmError::configuration("base_url", e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: 0.5,
            timeout: Duration::from_secs(60),
        })
    }

    /// Load from the environment (and a `.env` file when present)
    ///
    /// Reads `TONEWOOD_LLM_BASE_URL`, `TONEWOOD_LLM_API_KEY`,
    /// `TONEWOOD_LLM_MODEL`, `TONEWOOD_LLM_EMBEDDING_MODEL`,
    /// `TONEWOOD_LLM_TEMPERATURE` and `TONEWOOD_LLM_TIMEOUT_SECS`.
    pub fn from_env() -> LlmResult<Self> {
        dotenv::dotenv().ok();

        let base_url =
            std::env::var("TONEWOOD_LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(key) = std::env::var("TONEWOOD_LLM_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("TONEWOOD_LLM_MODEL") {
            config.chat_model = model;
        }
        if let Ok(model) = std::env::var("TONEWOOD_LLM_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(raw) = std::env::var("TONEWOOD_LLM_TEMPERATURE") {
            config.temperature = raw
                .parse()
                .map_err(|_| LlmError::configuration("temperature", format!("not a number: {raw}")))?;
        }
        if let Ok(raw) = std::env::var("TONEWOOD_LLM_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| LlmError::configuration("timeout", format!("not an integer: {raw}")))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the chat model
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Set the embedding model
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the default temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve an endpoint path against the base URL
    pub(crate) fn endpoint(&self, path: &str) -> LlmResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| LlmError::configuration("base_url", e.to_string()))
    }
}
