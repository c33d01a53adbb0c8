//! Distributed cache tier
//!
//! Typed wrapper over a [`DistributedCacheProvider`]: entries go through the
//! codec, every provider call is bounded by a timeout, and each outcome bumps
//! a per-tier counter. A timeout is reported as `BackendUnavailable`, the same
//! as a transport failure.

use crate::cache::codec::CacheKeyCodec;
use futures::{StreamExt, TryStreamExt};
use opscache_domain::error::{Error, Result};
use opscache_domain::ports::providers::cache::{DistributedCacheProvider, KeyStream};
use opscache_domain::value_objects::{CacheEntry, CacheLevel, Expiration, TierStats};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct DistributedCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl DistributedCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared tier behind a provider
#[derive(Clone)]
pub struct DistributedCache {
    provider: Arc<dyn DistributedCacheProvider>,
    timeout: Duration,
    counters: Arc<DistributedCounters>,
}

impl DistributedCache {
    /// Wrap `provider`, bounding each call by `timeout`
    pub fn new(provider: Arc<dyn DistributedCacheProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            counters: Arc::new(DistributedCounters::default()),
        }
    }

    /// Name of the backing provider
    pub fn backend(&self) -> &str {
        self.provider.provider_name()
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one provider call under the timeout, counting failures
    async fn call<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = self.bounded(operation, call).await;
        if result.is_err() {
            DistributedCounters::bump(&self.counters.errors);
        }
        result
    }

    /// Run one provider call under the timeout without touching the counters
    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(timeout_error(self.backend(), operation, self.timeout)))
    }

    /// Read an unexpired entry
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let payload = self.call("GET", self.provider.get(key)).await?;

        let entry = match payload {
            Some(payload) => Some(CacheKeyCodec::decode(&payload)?),
            None => None,
        };

        // The store's clock and ours may disagree; ours decides
        match entry {
            Some(entry) if !entry.is_expired() => {
                DistributedCounters::bump(&self.counters.hits);
                Ok(Some(entry))
            }
            _ => {
                DistributedCounters::bump(&self.counters.misses);
                Ok(None)
            }
        }
    }

    /// Encode and write an entry with its remaining lifetime
    ///
    /// An entry that is already expired is not written.
    pub async fn set(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let Some(expiration) = entry.remaining() else {
            return Ok(());
        };
        let payload = CacheKeyCodec::encode(entry)?;
        self.set_encoded(key, &payload, expiration).await
    }

    /// Write an already encoded entry
    pub async fn set_encoded(
        &self,
        key: &str,
        payload: &[u8],
        expiration: Expiration,
    ) -> Result<()> {
        self.call("SET", self.provider.set(key, payload, expiration))
            .await?;
        DistributedCounters::bump(&self.counters.sets);
        Ok(())
    }

    /// Delete one key; true when it existed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.call("DEL", self.provider.delete(key)).await?;
        if removed {
            DistributedCounters::bump(&self.counters.deletes);
        }
        Ok(removed)
    }

    /// Delete several keys; returns how many existed
    pub async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = self.call("DEL", self.provider.delete_many(keys)).await?;
        self.counters.deletes.fetch_add(removed, Ordering::Relaxed);
        Ok(removed)
    }

    /// Lazy stream of keys matching `pattern`
    ///
    /// Each step is bounded by the timeout; the stream ends after the first
    /// error.
    pub fn scan(&self, pattern: &str) -> KeyStream {
        let timeout = self.timeout;
        let backend = self.backend().to_string();
        let counters = Arc::clone(&self.counters);

        futures::stream::unfold(Some(self.provider.scan(pattern)), move |keys| {
            let backend = backend.clone();
            let counters = Arc::clone(&counters);
            async move {
                let mut keys = keys?;
                match tokio::time::timeout(timeout, keys.next()).await {
                    Ok(Some(Ok(key))) => Some((Ok(key), Some(keys))),
                    Ok(Some(Err(err))) => {
                        DistributedCounters::bump(&counters.errors);
                        Some((Err(err), None))
                    }
                    Ok(None) => None,
                    Err(_) => {
                        DistributedCounters::bump(&counters.errors);
                        Some((Err(timeout_error(&backend, "SCAN", timeout)), None))
                    }
                }
            }
        })
        .boxed()
    }

    /// Collect every key matching `pattern`
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.scan(pattern).try_collect().await
    }

    /// Round trip to the store; returns its latency
    pub async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        self.call("PING", self.provider.ping()).await?;
        Ok(started.elapsed())
    }

    /// Number of keys in the store
    ///
    /// Feeds statistics only: a failure is returned but not counted as a tier
    /// error.
    pub async fn size(&self) -> Result<u64> {
        self.bounded("DBSIZE", self.provider.size()).await
    }

    /// Remove every key of this cache from the store
    pub async fn clear(&self) -> Result<()> {
        self.call("CLEAR", self.provider.clear()).await
    }

    /// Release the provider's connection
    pub async fn close(&self) -> Result<()> {
        self.call("CLOSE", self.provider.close()).await
    }

    /// Current counters; `entries` is left for the caller to fill in
    pub fn stats(&self) -> TierStats {
        let mut stats = TierStats::new(CacheLevel::Distributed, self.backend());
        stats.hits = self.counters.hits.load(Ordering::Relaxed);
        stats.misses = self.counters.misses.load(Ordering::Relaxed);
        stats.sets = self.counters.sets.load(Ordering::Relaxed);
        stats.deletes = self.counters.deletes.load(Ordering::Relaxed);
        stats.errors = self.counters.errors.load(Ordering::Relaxed);
        stats
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.hits,
            &self.counters.misses,
            &self.counters.sets,
            &self.counters.deletes,
            &self.counters.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

fn timeout_error(backend: &str, operation: &str, timeout: Duration) -> Error {
    Error::backend_unavailable(
        backend,
        format!("{operation} timed out after {}ms", timeout.as_millis()),
    )
}

impl std::fmt::Debug for DistributedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedCache")
            .field("backend", &self.backend())
            .field("timeout", &self.timeout)
            .finish()
    }
}
