//! Cache manager factory
//!
//! Builds a [`CacheManager`] from configuration, resolving the distributed
//! provider by name from the provider registry.

use crate::cache::manager::CacheManager;
use crate::cache::policy::PolicyTable;
use crate::config::CacheConfig;
use opscache_domain::error::Result;
use opscache_domain::ports::registry::{DistributedProviderConfig, resolve_distributed_provider};
use std::sync::Arc;
use std::time::Duration;

// Link the provider crate so its registry entries are present
use opscache_providers as _;

/// Build a shared manager from configuration
///
/// Providers connect lazily, so an unreachable distributed store does not fail
/// construction; it shows up as a degraded health check instead.
pub fn build_cache_manager(config: &CacheConfig) -> Result<Arc<CacheManager>> {
    let mut builder = CacheManager::builder()
        .enabled(config.enabled)
        .key_prefix(config.key_prefix.clone())
        .local_capacity(config.local.max_entries)
        .sweep_interval(Duration::from_secs(config.local.sweep_interval_secs))
        .policies(PolicyTable::from_config(config));

    if let Some(distributed) = &config.distributed {
        let mut provider_config = DistributedProviderConfig::new(&distributed.provider);
        if let Some(uri) = &distributed.uri {
            provider_config = provider_config.with_uri(uri);
        }
        if let Some(prefix) = &distributed.key_prefix {
            provider_config = provider_config.with_key_prefix(prefix);
        }

        builder = builder
            .distributed(resolve_distributed_provider(&provider_config)?)
            .distributed_timeout(Duration::from_millis(distributed.timeout_ms));
    }

    Ok(Arc::new(builder.build()?))
}
