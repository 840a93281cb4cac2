//! Client for the upstream LLM provider's messages endpoint.
//!
//! The relay treats the provider as a black box that accepts a message
//! array plus a system prompt and answers either with a single completion
//! or with an SSE stream of incremental deltas.

use serde::Deserialize;
use serde_json::Value;

use crate::chat::error::{ChatError, ChatResult};

/// Default provider endpoint.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default model identifier.
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Token budget for streamed chat turns.
const CHAT_MAX_TOKENS: u32 = 4096;

/// Token budget for one-shot content generation.
const CONTENT_MAX_TOKENS: u32 = 1024;

/// Provider API version header value.
const API_VERSION: &str = "2023-06-01";

/// Upstream connection settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Provider base URL.
    pub base_url: String,
    /// Provider API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl UpstreamConfig {
    /// Build configuration from environment variables
    /// (`UPLIFT_UPSTREAM_URL`, `UPLIFT_API_KEY`, `UPLIFT_MODEL`).
    ///
    /// # Errors
    /// Returns an error if the API key is unset or the base URL is invalid.
    pub fn from_env() -> ChatResult<Self> {
        let base_url =
            std::env::var("UPLIFT_UPSTREAM_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)?;

        let api_key = std::env::var("UPLIFT_API_KEY")
            .map_err(|_| ChatError::Validation("UPLIFT_API_KEY is not configured".to_string()))?;

        let model = std::env::var("UPLIFT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Non-streaming completion response; only the first text block matters.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Thin client over the provider's messages endpoint.
pub struct UpstreamClient {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// Create a client with the given configuration.
    #[must_use]
    pub fn new(client: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Issue one streaming chat request, returning the raw response so the
    /// relay can pass the SSE body through unmodified.
    ///
    /// # Errors
    /// Returns an error only on transport failure; a non-2xx status is
    /// returned as a normal response for the caller to mirror.
    pub async fn stream_messages(
        &self,
        system: &str,
        messages: &[Value],
    ) -> ChatResult<reqwest::Response> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": CHAT_MAX_TOKENS,
            "system": system,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        Ok(response)
    }

    /// Request one non-streaming completion and extract its text.
    ///
    /// # Errors
    /// Returns `ChatError::RelayStatus` on a non-2xx upstream status and
    /// `ChatError::UpstreamShape` if the response carries no text block.
    pub async fn complete(&self, system: &str, user_prompt: &str) -> ChatResult<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": CONTENT_MAX_TOKENS,
            "system": system,
            "messages": [{ "role": "user", "content": user_prompt }],
        });

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "upstream completion failed: {body}");
            return Err(ChatError::RelayStatus {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ChatError::UpstreamShape("no text content block".to_string()))
    }
}
