//! Provider connection registry.
//!
//! An explicit keyed cache of provider clients: created on first use, reused
//! for every later session, never invalidated mid-process. Sessions borrow
//! `Arc` handles; the registry itself is the only owner of the map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::client::ProviderClient;
use super::config::{Config, ProviderKind};
use super::errors::ProviderError;

/// Keyed registry of shared provider connections.
pub struct ProviderRegistry {
    config: Config,
    clients: Mutex<HashMap<ProviderKind, Arc<ProviderClient>>>,
}

impl ProviderRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration the registry was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the shared client for `kind`, connecting it on first use.
    ///
    /// A failed connect is not cached: the next lookup retries, so a key that
    /// appears in the environment later (process restart aside) or a transient
    /// construction failure does not poison the registry.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<ProviderClient>, ProviderError> {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = clients.get(&kind) {
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(ProviderClient::connect(
            kind,
            self.config.provider(kind).clone(),
        )?);
        tracing::info!(provider = %kind, model = client.model_name(), "provider connected");
        clients.insert(kind, Arc::clone(&client));
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::config::Config;

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("k-gemini".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_repeated_lookup_returns_same_client() {
        let registry = ProviderRegistry::new(test_config());
        let a = registry.get(ProviderKind::Gemini).unwrap();
        let b = registry.get(ProviderKind::Gemini).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_missing_key_is_not_cached() {
        let registry = ProviderRegistry::new(test_config());
        // Gpt4o has no key in the test environment.
        assert!(registry.get(ProviderKind::Gpt4o).is_err());
        // The failure did not poison the map for other providers.
        assert!(registry.get(ProviderKind::Gemini).is_ok());
    }
}
