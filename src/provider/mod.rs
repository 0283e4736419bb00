//! Provider layer — OpenAI-compatible clients for hosted language models.
//!
//! This module handles all communication with the backing model providers:
//! - Streaming and non-streaming chat completions
//! - SSE stream parsing
//! - Environment-driven configuration
//! - The keyed connection registry shared across sessions
//!
//! Every provider speaks the OpenAI Chat Completions dialect, making the
//! model interchangeable via the request's `model` field. Switching from
//! Gemini to GPT-4o is a request parameter, not a code change.

pub mod client;
pub mod config;
pub mod errors;
pub mod registry;
pub mod streaming;
pub mod types;

// Re-exports for convenience
pub use client::ProviderClient;
pub use config::{Config, ProviderConfig, ProviderKind};
pub use errors::ProviderError;
pub use registry::ProviderRegistry;
pub use types::{ChatMessage, Role};
