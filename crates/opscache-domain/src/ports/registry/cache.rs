//! Distributed Cache Provider Registry
//!
//! Auto-registration system for distributed cache providers.
//! Providers register themselves via `linkme::distributed_slice` and are
//! resolved by name from configuration at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ports::providers::cache::DistributedCacheProvider;

/// Configuration for distributed provider creation
///
/// Contains all configuration options that a provider might need.
/// Providers should use what they need and ignore the rest.
#[derive(Debug, Clone, Default)]
pub struct DistributedProviderConfig {
    /// Provider name (e.g., "redis", "memory")
    pub provider: String,
    /// Connection URI
    pub uri: Option<String>,
    /// Prefix prepended to every key the provider stores
    pub key_prefix: Option<String>,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

impl DistributedProviderConfig {
    /// Create a new config with the given provider name
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Set the URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Add extra configuration
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Registry entry for distributed cache providers
pub struct DistributedProviderEntry {
    /// Unique provider name (e.g., "redis", "memory")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create provider instance
    pub factory: fn(&DistributedProviderConfig) -> Result<Arc<dyn DistributedCacheProvider>>,
}

#[linkme::distributed_slice]
pub static DISTRIBUTED_CACHE_PROVIDERS: [DistributedProviderEntry] = [..];

/// Resolve a distributed provider by name from the registry
///
/// # Returns
/// * `Ok(Arc<dyn DistributedCacheProvider>)` - Created provider instance
/// * `Err(Error::Configuration)` - Unknown provider or factory failure
pub fn resolve_distributed_provider(
    config: &DistributedProviderConfig,
) -> Result<Arc<dyn DistributedCacheProvider>> {
    if let Some(entry) = DISTRIBUTED_CACHE_PROVIDERS
        .iter()
        .find(|entry| entry.name == config.provider)
    {
        return (entry.factory)(config);
    }

    let available: Vec<&str> = DISTRIBUTED_CACHE_PROVIDERS.iter().map(|e| e.name).collect();
    Err(Error::configuration(format!(
        "Unknown distributed cache provider '{}'. Available providers: {:?}",
        config.provider, available
    )))
}

/// List all registered distributed providers as (name, description)
pub fn list_distributed_providers() -> Vec<(&'static str, &'static str)> {
    DISTRIBUTED_CACHE_PROVIDERS
        .iter()
        .map(|e| (e.name, e.description))
        .collect()
}
