//! The generation capability agents depend on

use crate::error::LlmResult;
use crate::message::ChatMessage;
use async_trait::async_trait;

/// Everything a backend needs to produce one completion
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt messages, system message first
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature override
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Start a request from a system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            temperature: None,
        }
    }

    /// Append a message
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Append several messages in order
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Text of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

/// A text generation backend
///
/// Implementations fail with an [`LlmError`](crate::LlmError) on quota,
/// timeout, or network problems. Callers never inspect model identifiers.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for the request
    async fn generate(&self, request: GenerationRequest) -> LlmResult<String>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}
