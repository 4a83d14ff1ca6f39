//! LLM client abstraction and the OpenAI-compatible implementation.
//!
//! The conversation flow depends on [`LlmClient`] only, so tests can script
//! answers and deployments can point [`OpenAiClient`] at any endpoint that
//! speaks the chat-completions protocol.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::LlmConfig;

/// System prompt sent with every completion
pub const SYSTEM_PROMPT: &str = "Ты — креативный генератор идей и концепций.";

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Error type for LLM calls
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Response contained no choices")]
    EmptyChoices,
}

/// Text completion backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Run a completion and map every failure to an empty string.
///
/// Callers treat an empty answer as a failed generation.
pub async fn complete_or_empty(client: &dyn LlmClient, request: &CompletionRequest) -> String {
    match client.complete(request).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            error!(model = %request.model, error = %e, "LLM completion failed");
            String::new()
        }
    }
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = ChatCompletionRequest::from_request(request);

        debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            max_tokens = request.max_tokens,
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let api_response: ChatCompletionResponse = response.json().await?;
        let text = api_response.into_text()?;

        debug!(model = %request.model, response_len = text.len(), "Chat completion received");
        Ok(text)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_request(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    fn into_text(self) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or(LlmError::EmptyChoices)
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::EmptyChoices)
        }
    }

    fn sample_request() -> CompletionRequest {
        CompletionRequest {
            prompt: "Придумай имя".to_string(),
            model: "test-model".to_string(),
            max_tokens: 40,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let request = sample_request();
        let body = serde_json::to_value(ChatCompletionRequest::from_request(&request)).unwrap();

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 40);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Придумай имя");
    }

    #[test]
    fn test_response_text_extraction() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"бизнес\ncoffee_spot"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "бизнес\ncoffee_spot");

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(empty.into_text(), Err(LlmError::EmptyChoices)));

        let null_content: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(null_content.into_text().unwrap(), "");
    }

    #[tokio::test]
    async fn test_complete_or_empty_swallows_errors() {
        let text = complete_or_empty(&FailingClient, &sample_request()).await;
        assert!(text.is_empty());
    }
}
