//! Tool invocation error types.
//!
//! These never escape the tools layer: every client captures its own failure
//! into a `ToolResult { success: false, error }`.

use thiserror::Error;

/// Errors from the external task/calendar/search/clock services.
#[derive(Debug, Error)]
pub enum ToolError {
    /// TCP/HTTP connection to the service failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// Non-2xx HTTP response from the service.
    #[error("HTTP {status} from {service}: {body}")]
    HttpError {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered with a body we could not interpret.
    #[error("invalid response from {service}: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    /// The client was built without the settings it needs.
    #[error("{service} is not configured: {reason}")]
    NotConfigured {
        service: &'static str,
        reason: String,
    },
}

impl ToolError {
    pub(crate) fn from_reqwest(endpoint: &str, e: reqwest::Error) -> Self {
        ToolError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}
