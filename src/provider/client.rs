//! OpenAI-compatible provider client.
//!
//! Sends chat completion requests to the configured provider endpoint and
//! streams back text tokens. One client exists per provider; the registry
//! caches and shares them across sessions.

use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client as HttpClient;

use super::config::{ProviderConfig, ProviderKind};
use super::errors::ProviderError;
use super::streaming::{parse_completion_response, parse_sse_stream};
use super::types::{ChatCompletionRequest, ChatMessage};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout for non-streaming calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Total request timeout for streaming calls. Hosted models can take a while
/// to emit the first token on long prompts; a short timeout here reads as a
/// silent empty stream to the phase controller.
const STREAM_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

// ─── ProviderClient ──────────────────────────────────────────────────────────

/// Client for one language-model provider endpoint.
///
/// Holds two HTTP clients with different timeout budgets. Treated as
/// append-only configuration after construction — nothing is mutated
/// per-request, so a single instance is safely shared across sessions.
pub struct ProviderClient {
    kind: ProviderKind,
    http: HttpClient,
    http_stream: HttpClient,
    config: ProviderConfig,
    api_key: String,
}

impl ProviderClient {
    /// Build a client for `kind` from its resolved settings.
    ///
    /// Fails fast when the API key variable was unset; does NOT check
    /// connectivity — that happens on the first request.
    pub fn connect(kind: ProviderKind, config: ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::ConfigError {
                reason: format!("no API key configured for provider '{kind}'"),
            })?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let http_stream = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(STREAM_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build streaming HTTP client: {e}"),
            })?;

        Ok(Self {
            kind,
            http,
            http_stream,
            config,
            api_key,
        })
    }

    /// Which provider this client talks to.
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// The model name sent with every request.
    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn request_body(&self, messages: Vec<ChatMessage>, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model_name.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        }
    }

    // ─── Chat completion (streaming) ─────────────────────────────────────

    /// Send a streaming chat completion request and return a token stream.
    ///
    /// The stream owns its connection — it outlives this client borrow and
    /// can be moved onto another task.
    pub async fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<BoxStream<'static, Result<String, ProviderError>>, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.request_body(messages, true);

        tracing::info!(
            provider = %self.kind,
            model = %body.model,
            message_count = body.messages.len(),
            "provider stream request"
        );

        let response = self
            .http_stream
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_send_error(&url, e, STREAM_REQUEST_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        Ok(parse_sse_stream(response).boxed())
    }

    // ─── Chat completion (non-streaming) ─────────────────────────────────

    /// Send a non-streaming chat completion request and return the full text.
    ///
    /// Used by the draft builder's elaboration call, where the response is
    /// parsed as JSON rather than relayed token-by-token.
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.request_body(messages, false);

        tracing::debug!(provider = %self.kind, model = %body.model, "provider completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_send_error(&url, e, REQUEST_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| ProviderError::StreamError {
                reason: format!("failed to read response body: {e}"),
            })?;

        parse_completion_response(&body_text, &self.config.model_name)
    }
}

/// Map a reqwest send error onto the provider error taxonomy.
fn classify_send_error(url: &str, e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout {
            duration_secs: timeout.as_secs(),
        }
    } else {
        ProviderError::ConnectionFailed {
            endpoint: url.to_string(),
            reason: e.to_string(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider_config(api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            base_url: "http://localhost:11111/v1".to_string(),
            api_key: api_key.map(String::from),
            model_name: "test-model".to_string(),
            temperature: 0.7,
            max_tokens: 256,
        }
    }

    #[test]
    fn test_connect_requires_api_key() {
        let result = ProviderClient::connect(ProviderKind::Gemini, test_provider_config(None));
        assert!(matches!(result, Err(ProviderError::ConfigError { .. })));
    }

    #[test]
    fn test_connect_with_key() {
        let client =
            ProviderClient::connect(ProviderKind::Gpt4o, test_provider_config(Some("k"))).unwrap();
        assert_eq!(client.kind(), ProviderKind::Gpt4o);
        assert_eq!(client.model_name(), "test-model");
    }

    #[test]
    fn test_request_body_carries_config() {
        let client =
            ProviderClient::connect(ProviderKind::Gemini, test_provider_config(Some("k"))).unwrap();
        let body = client.request_body(vec![ChatMessage::user("hi")], true);
        assert_eq!(body.model, "test-model");
        assert_eq!(body.max_tokens, 256);
        assert!(body.stream);
    }
}
