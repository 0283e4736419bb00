//! Stream event model — the line-delimited JSON objects a caller consumes.

use serde::{Deserialize, Serialize};

/// A named segment of a streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseMode {
    Reasoning,
    Answer,
    Direct,
    Tool,
}

/// Event type. `End` and `Error` are terminal: they close a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Start,
    Content,
    End,
    Error,
}

/// One event in the ordered response stream.
///
/// `mode` is absent only on the pre-phase validation error — every other
/// event belongs to a phase. Consumers treat the stream as closed after the
/// final terminal event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub event: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PhaseMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl StreamEvent {
    pub fn start(mode: PhaseMode) -> Self {
        Self {
            event: EventType::Start,
            mode: Some(mode),
            text: None,
            metadata: None,
        }
    }

    pub fn content(mode: PhaseMode, text: impl Into<String>) -> Self {
        Self {
            event: EventType::Content,
            mode: Some(mode),
            text: Some(text.into()),
            metadata: None,
        }
    }

    pub fn end(mode: PhaseMode) -> Self {
        Self {
            event: EventType::End,
            mode: Some(mode),
            text: None,
            metadata: None,
        }
    }

    pub fn error(mode: Option<PhaseMode>, text: impl Into<String>) -> Self {
        Self {
            event: EventType::Error,
            mode,
            text: Some(text.into()),
            metadata: None,
        }
    }

    /// Whether this event closes a phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self.event, EventType::End | EventType::Error)
    }
}
