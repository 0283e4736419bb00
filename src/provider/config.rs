//! Configuration loading and validation.
//!
//! Everything is environment-driven: an optional `.env` file is read first,
//! then process environment variables with defaults. Config is the single
//! source of truth for provider endpoints, tool endpoints, and the assistant's
//! fixed display timezone.

use std::fmt;

use chrono_tz::Tz;

use super::errors::ProviderError;

// ─── Provider identity ───────────────────────────────────────────────────────

/// Which backing language-model provider a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    Gpt4o,
}

impl ProviderKind {
    /// Parse the `model` field of an inbound request. Unknown values fall
    /// back to Gemini, matching the request default.
    pub fn from_request(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpt4o" | "gpt-4o" => ProviderKind::Gpt4o,
            _ => ProviderKind::Gemini,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Gpt4o => write!(f, "gpt4o"),
        }
    }
}

// ─── Per-provider settings ───────────────────────────────────────────────────

/// A single provider's connection settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// OpenAI-compatible base URL (no trailing slash).
    pub base_url: String,
    /// API key, resolved from the environment. `None` means the key variable
    /// was unset — connecting with it is a `ConfigError`.
    pub api_key: Option<String>,
    /// Model name sent in the request body.
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Top-level configuration for the whole backend.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: ProviderConfig,
    pub gpt4o: ProviderConfig,
    /// Task store API base, e.g. `https://tasks.googleapis.com/tasks/v1`.
    pub tasks_base_url: String,
    /// Calendar API base, e.g. `https://www.googleapis.com/calendar/v3`.
    pub calendar_base_url: String,
    /// Web search endpoint; search is disabled when unset.
    pub search_url: Option<String>,
    pub search_api_key: Option<String>,
    /// Remote clock service endpoint (locale-aware current time).
    pub time_api_url: String,
    /// Fixed timezone used for all serialized timestamps.
    pub timezone: Tz,
}

impl Config {
    /// Load configuration: read `.env` if present, then the process
    /// environment. Never panics; bad values degrade to defaults except the
    /// timezone, which must parse.
    pub fn load() -> Result<Self, ProviderError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from a key-value lookup. Split out from [`load`] so tests
    /// can inject an environment without mutating process state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ProviderError> {
        let temperature = get("MODEL_TEMPERATURE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.7);
        let max_tokens = get("MODEL_MAX_TOKENS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(4096);

        let gemini = ProviderConfig {
            base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| {
                "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
            }),
            api_key: get("GEMINI_API_KEY"),
            model_name: get("GEMINI_MODEL_NAME").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            temperature,
            max_tokens,
        };
        let gpt4o = ProviderConfig {
            base_url: get("AZURE_OPENAI_ENDPOINT")
                .unwrap_or_else(|| "https://models.inference.ai.azure.com".to_string()),
            api_key: get("AZURE_OPENAI_API_KEY").or_else(|| get("GITHUB_TOKEN")),
            model_name: get("AZURE_MODEL_NAME").unwrap_or_else(|| "gpt-4o".to_string()),
            temperature,
            max_tokens,
        };

        let tz_name = get("ASSISTANT_TIMEZONE").unwrap_or_else(|| "Asia/Kolkata".to_string());
        let timezone: Tz = tz_name.parse().map_err(|_| ProviderError::ConfigError {
            reason: format!("unknown timezone '{tz_name}' in ASSISTANT_TIMEZONE"),
        })?;

        Ok(Self {
            gemini,
            gpt4o,
            tasks_base_url: get("TASKS_API_URL")
                .unwrap_or_else(|| "https://tasks.googleapis.com/tasks/v1".to_string()),
            calendar_base_url: get("CALENDAR_API_URL")
                .unwrap_or_else(|| "https://www.googleapis.com/calendar/v3".to_string()),
            search_url: get("TAVILY_API_URL"),
            search_api_key: get("TAVILY_API_KEY"),
            time_api_url: get("TIME_API_URL")
                .unwrap_or_else(|| "https://timeapi.io/api/Time/current/zone".to_string()),
            timezone,
        })
    }

    /// Settings for one provider. Total over [`ProviderKind`].
    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Gpt4o => &self.gpt4o,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults_with_empty_environment() {
        let cfg = Config::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.timezone, chrono_tz::Asia::Kolkata);
        assert!(cfg.tasks_base_url.contains("tasks.googleapis.com"));
        assert!(cfg.search_url.is_none());

        let gemini = cfg.provider(ProviderKind::Gemini);
        assert_eq!(gemini.model_name, "gemini-2.0-flash");
        assert!(gemini.api_key.is_none());
        assert_eq!(gemini.max_tokens, 4096);
    }

    #[test]
    fn test_environment_overrides() {
        let cfg = Config::from_lookup(env(&[
            ("GEMINI_API_KEY", "k-123"),
            ("MODEL_TEMPERATURE", "0.2"),
            ("MODEL_MAX_TOKENS", "1024"),
            ("ASSISTANT_TIMEZONE", "Europe/London"),
        ]))
        .unwrap();
        let gemini = cfg.provider(ProviderKind::Gemini);
        assert_eq!(gemini.api_key.as_deref(), Some("k-123"));
        assert_eq!(gemini.temperature, 0.2);
        assert_eq!(gemini.max_tokens, 1024);
        assert_eq!(cfg.timezone, chrono_tz::Europe::London);
    }

    #[test]
    fn test_bad_timezone_is_config_error() {
        let result = Config::from_lookup(env(&[("ASSISTANT_TIMEZONE", "Mars/Olympus")]));
        assert!(matches!(result, Err(ProviderError::ConfigError { .. })));
    }

    #[test]
    fn test_gpt4o_key_falls_back_to_github_token() {
        let cfg = Config::from_lookup(env(&[("GITHUB_TOKEN", "gh-1")])).unwrap();
        assert_eq!(
            cfg.provider(ProviderKind::Gpt4o).api_key.as_deref(),
            Some("gh-1")
        );
    }

    #[test]
    fn test_provider_kind_from_request() {
        assert_eq!(ProviderKind::from_request("gpt4o"), ProviderKind::Gpt4o);
        assert_eq!(ProviderKind::from_request("GPT-4o"), ProviderKind::Gpt4o);
        assert_eq!(ProviderKind::from_request("gemini"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::from_request("anything"), ProviderKind::Gemini);
    }
}
