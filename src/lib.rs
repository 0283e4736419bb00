//! majordomo — conversational assistant backend.
//!
//! Turns one free-text utterance into either a multi-phase streamed answer
//! or a structured side effect (creating/retrieving a task or calendar
//! event), chosen from the utterance itself with no command syntax.
//!
//! Layering, leaf-first:
//! - `extract`: date/time/field extraction from free text
//! - `intent`: ordered-rule intent routing
//! - `provider`: language-model clients and the shared connection registry
//! - `draft`: structured task/event drafts with a deterministic fallback
//! - `tools`: task store, calendar, web search, and clock adapters
//! - `stream`: the phase controller and its ordered event model
//! - `session`: the per-request facade composing all of the above
//!
//! Transport framing and credential storage are collaborator concerns; the
//! driver binary in `main.rs` is only a thin stdin/stdout harness.

pub mod draft;
pub mod extract;
pub mod intent;
pub mod logging;
pub mod provider;
pub mod session;
pub mod stream;
pub mod tools;

pub use provider::{Config, ProviderRegistry};
pub use session::{ChatRequest, ChatSession};
pub use stream::StreamEvent;
