//! HTTP client for OpenAI-compatible chat and embedding endpoints

use crate::config::ClientConfig;
use crate::error::{LlmError, LlmResult};
use crate::generator::{GenerationRequest, Generator};
use crate::message::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completed chat response
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Generated text
    pub content: String,

    /// Model that produced it
    pub model: String,

    /// Why generation stopped, when reported
    pub finish_reason: Option<String>,
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequestBody<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponseBody {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible backend
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Build a client from configuration
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::http("build_client", e))?;

        Ok(Self { http, config })
    }

    /// Build a client from environment variables
    pub fn from_env() -> LlmResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a chat completion
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> LlmResult<ChatResponse> {
        let url = self.config.endpoint("chat/completions")?;
        let body = ChatRequestBody {
            model: &self.config.chat_model,
            messages,
            temperature: temperature.unwrap_or(self.config.temperature),
        };

        debug!(
            model = %self.config.chat_model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .authorized(self.http.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::http("chat_completion", e))?;

        let parsed: ChatResponseBody = Self::decode(response, "chat_completion").await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invalid_response("no choices in chat response"))?;

        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::invalid_response("empty completion"))?;

        Ok(ChatResponse {
            content,
            model: parsed.model,
            finish_reason: choice.finish_reason,
        })
    }

    /// Embed a single text
    pub async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        let url = self.config.endpoint("embeddings")?;
        let body = EmbeddingRequestBody {
            model: &self.config.embedding_model,
            input: text,
        };

        let response = self
            .authorized(self.http.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::http("embed", e))?;

        let parsed: EmbeddingResponseBody = Self::decode(response, "embed").await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::invalid_response("no embedding in response"))?;

        if vector.is_empty() {
            return Err(LlmError::invalid_response("embedding has zero dimensions"));
        }

        Ok(vector)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> LlmResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LlmError::invalid_response(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl Generator for Client {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<String> {
        let response = self
            .chat_completion(&request.messages, request.temperature)
            .await?;
        Ok(response.content)
    }

    fn name(&self) -> &str {
        &self.config.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> Client {
        let config = ClientConfig::new(&format!("{}/v1", server.uri()))
            .unwrap()
            .with_api_key("test-key");
        Client::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_chat_completion_parses_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-mini",
                "choices": [
                    {"message": {"role": "assistant", "content": "A humbucker cancels hum."}, "finish_reason": "stop"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let request = GenerationRequest::new("system").with_message(ChatMessage::user("humbucker?"));
        let text = client.generate(request).await.unwrap();

        assert_eq!(text, "A humbucker cancels hum.");
    }

    #[tokio::test]
    async fn test_error_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .chat_completion(&[ChatMessage::user("hi")], None)
            .await
            .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_completion_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "  "}, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .chat_completion(&[ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let vector = client.embed("rock guitar").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }
}
