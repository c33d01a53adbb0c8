//! Cache Infrastructure Tests
//!
//! Manager behavior across both tiers, backed by the in-process memory
//! provider so outages and slow stores can be simulated.

mod factory_test;
mod invalidation_test;
mod manager_test;
mod memoize_test;

use opscache_infrastructure::cache::CacheManager;
use opscache_providers::cache::MemoryCacheProvider;
use std::sync::Arc;
use std::time::Duration;

/// Manager over a fresh memory store, plus a handle to that store
pub fn two_tier_manager() -> (CacheManager, MemoryCacheProvider) {
    let store = MemoryCacheProvider::new();
    (manager_over(&store, 100), store)
}

/// Manager sharing `store` with any other manager built over it
pub fn manager_over(store: &MemoryCacheProvider, local_capacity: u64) -> CacheManager {
    CacheManager::builder()
        .local_capacity(local_capacity)
        .distributed(Arc::new(store.clone()))
        .distributed_timeout(Duration::from_millis(200))
        .build()
        .unwrap()
}
