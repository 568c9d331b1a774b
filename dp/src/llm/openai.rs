//! OpenAI-compatible chat completions client
//!
//! Talks to any provider exposing `POST {base_url}/chat/completions`
//! (OpenRouter by default). One HTTP request per call, bounded by the
//! per-request timeout; failures surface to the caller unchanged.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, TokenUsage};
use crate::config::LlmConfig;

/// OpenAI-compatible API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenAIClient {
    /// Create a client with an explicit key (empty means unauthenticated)
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        debug!(%model, %base_url, "OpenAIClient::new: called");
        let http = Client::builder().build().map_err(LlmError::Network)?;

        Ok(Self {
            model,
            api_key: api_key.into(),
            base_url,
            http,
        })
    }

    /// Create a client from configuration, reading the key from the configured env var
    ///
    /// A missing key is not an error: the client is built and calls will be
    /// rejected by the provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, api_key_env = %config.api_key_env, "from_config: called");
        let api_key = match config.api_key() {
            Some(key) => key,
            None => {
                warn!(env = %config.api_key_env, "from_config: API key not set, AI features will be rejected");
                String::new()
            }
        };
        Self::new(&config.model, api_key, &config.base_url)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the chat completions API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(request.messages.iter().map(convert_message));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    /// Parse the API response
    fn parse_response(&self, api_response: OpenAIResponse) -> Result<CompletionResponse, LlmError> {
        debug!(choice_count = %api_response.choices.len(), "parse_response: called");
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage,
        })
    }
}

fn convert_message(msg: &Message) -> serde_json::Value {
    serde_json::json!({
        "role": msg.role,
        "content": msg.content,
    })
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, ?request.timeout, "complete: called");
        let body = self.build_request_body(&request);
        let timeout = request.timeout;
        let map_send_error = |e: reqwest::Error| {
            if e.is_timeout() {
                LlmError::Timeout(timeout)
            } else {
                LlmError::Network(e)
            }
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = %status.as_u16(), "complete: API error");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let text = response.text().await.map_err(map_send_error)?;
        let api_response: OpenAIResponse = serde_json::from_str(&text)?;
        debug!("complete: success");
        self.parse_response(api_response)
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
