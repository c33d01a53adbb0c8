//! In-process distributed cache provider
//!
//! A stand-in for the shared tier that keeps everything in process memory.
//! Clones share the same store, so two cache managers built from clones of
//! one provider see each other's writes the way two processes sharing a Redis
//! instance would.
//!
//! ## Features
//!
//! - Native TTL with millisecond precision
//! - Glob key scanning
//! - Availability switch and injected latency for outage and timeout drills
//!
//! ## Example
//!
//! ```ignore
//! use opscache_providers::cache::MemoryCacheProvider;
//!
//! let store = MemoryCacheProvider::new();
//! store.set_available(false); // every call now fails with BackendUnavailable
//! ```

use crate::cache::pattern::KeyPattern;
use crate::constants::MEMORY_PROVIDER_NAME;
use async_trait::async_trait;
use futures::StreamExt;
use opscache_domain::error::{Error, Result};
use opscache_domain::ports::providers::cache::{DistributedCacheProvider, KeyStream};
use opscache_domain::value_objects::Expiration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredValue {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Memory-backed distributed cache provider
#[derive(Clone)]
pub struct MemoryCacheProvider {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
    available: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl Default for MemoryCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheProvider {
    /// Create an empty, reachable store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            latency_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Mark the store reachable or unreachable
    ///
    /// While unreachable every call fails with `BackendUnavailable`; stored
    /// entries are kept and visible again once the store is reachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether the store currently accepts calls
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Simulate the round trip and availability of a remote store
    async fn round_trip(&self, operation: &str) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.is_available() {
            Ok(())
        } else {
            Err(Error::backend_unavailable(
                MEMORY_PROVIDER_NAME,
                format!("{operation} failed: store is unreachable"),
            ))
        }
    }

    fn read_entries(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, StoredValue>>> {
        self.entries
            .read()
            .map_err(|_| Error::internal("Memory cache store lock poisoned"))
    }

    fn write_entries(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, StoredValue>>> {
        self.entries
            .write()
            .map_err(|_| Error::internal("Memory cache store lock poisoned"))
    }

    fn live_keys_matching(&self, pattern: &KeyPattern) -> Result<Vec<String>> {
        let now = Instant::now();
        let entries = self.read_entries()?;
        Ok(entries
            .iter()
            .filter(|(key, value)| value.is_live(now) && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[async_trait]
impl DistributedCacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.round_trip("GET").await?;

        let now = Instant::now();
        let mut entries = self.write_entries()?;
        match entries.get(key) {
            Some(value) if value.is_live(now) => Ok(Some(value.payload.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &[u8], expiration: Expiration) -> Result<()> {
        self.round_trip("SET").await?;

        let expires_at = expiration
            .as_duration()
            .and_then(|ttl| Instant::now().checked_add(ttl));
        self.write_entries()?.insert(
            key.to_string(),
            StoredValue {
                payload: payload.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.round_trip("DEL").await?;

        let now = Instant::now();
        Ok(self
            .write_entries()?
            .remove(key)
            .is_some_and(|value| value.is_live(now)))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        self.round_trip("DEL").await?;

        let now = Instant::now();
        let mut entries = self.write_entries()?;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|value| value.is_live(now))
            .count();
        Ok(removed as u64)
    }

    fn scan(&self, pattern: &str) -> KeyStream {
        let provider = self.clone();
        let pattern = pattern.to_string();

        async_stream::try_stream! {
            provider.round_trip("SCAN").await?;
            let pattern = KeyPattern::new(&pattern)?;
            for key in provider.live_keys_matching(&pattern)? {
                yield key;
            }
        }
        .boxed()
    }

    async fn ping(&self) -> Result<()> {
        self.round_trip("PING").await
    }

    async fn size(&self) -> Result<u64> {
        self.round_trip("DBSIZE").await?;

        let now = Instant::now();
        let entries = self.read_entries()?;
        Ok(entries.values().filter(|value| value.is_live(now)).count() as u64)
    }

    async fn clear(&self) -> Result<()> {
        self.round_trip("FLUSHDB").await?;
        self.write_entries()?.clear();
        Ok(())
    }

    fn provider_name(&self) -> &str {
        MEMORY_PROVIDER_NAME
    }
}

impl std::fmt::Debug for MemoryCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().map(|e| e.len()).unwrap_or_default();
        f.debug_struct("MemoryCacheProvider")
            .field("entries", &entries)
            .field("available", &self.is_available())
            .finish()
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use opscache_domain::ports::registry::{
    DISTRIBUTED_CACHE_PROVIDERS, DistributedProviderConfig, DistributedProviderEntry,
};

#[linkme::distributed_slice(DISTRIBUTED_CACHE_PROVIDERS)]
static MEMORY_PROVIDER: DistributedProviderEntry = DistributedProviderEntry {
    name: "memory",
    description: "In-process shared store (single node, development, tests)",
    factory: |_config: &DistributedProviderConfig| Ok(Arc::new(MemoryCacheProvider::new())),
};
