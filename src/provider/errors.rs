//! Provider error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility — these types carry the context needed to
//! build meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to a language-model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// TCP/HTTP connection to the provider endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The provider did not respond within the configured timeout.
    #[error("provider timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response from the provider endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// SSE stream parsing or chunk-level error.
    #[error("stream error: {reason}")]
    StreamError { reason: String },

    /// The provider returned a completion with no usable text.
    #[error("empty completion from {model}")]
    EmptyCompletion { model: String },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl ProviderError {
    /// Check whether this error is a quota/billing rejection.
    ///
    /// Providers signal exhausted quota as HTTP 402/429 or a 403 whose body
    /// mentions quota or billing. These are surfaced to the caller as a
    /// human-readable chunk rather than a bare status code.
    pub fn is_quota_error(&self) -> bool {
        match self {
            ProviderError::HttpError { status: 402 | 429, .. } => true,
            ProviderError::HttpError { status: 403, body } => {
                let body = body.to_ascii_lowercase();
                body.contains("quota") || body.contains("billing") || body.contains("balance")
            }
            _ => false,
        }
    }

    /// A single human-readable line describing the failure, streamed to the
    /// caller before the terminal `error` event.
    pub fn user_message(&self) -> String {
        if self.is_quota_error() {
            return "The language model rejected the request: quota or balance exhausted. \
                    Please check the provider account and try again."
                .to_string();
        }
        match self {
            ProviderError::ConnectionFailed { .. } | ProviderError::Timeout { .. } => {
                "The language model is not reachable right now. Please try again in a moment."
                    .to_string()
            }
            other => format!("The language model call failed: {other}"),
        }
    }
}
