//! Local cache tier
//!
//! In-process, bounded, TTL-aware store built on Moka.
//!
//! ## Features
//!
//! - Strict least-recently-used eviction once `max_entries` is reached,
//!   applied before `set` returns
//! - Lazy expiry: an expired entry is removed on the read that finds it
//! - Optional sweep removing expired entries nobody reads
//! - Optional hook told about every entry dropped by eviction or expiry
//! - Atomic hit, miss, set, delete and eviction counters
//!
//! ## Example
//!
//! ```ignore
//! use opscache_infrastructure::cache::LocalCache;
//!
//! let local = LocalCache::new(10_000);
//! local.set("dashboard:7", entry);
//! assert!(local.get("dashboard:7").is_some());
//! ```

use crate::constants::{LOCAL_CACHE_BACKEND_NAME, LOCAL_CACHE_PROBE_KEY};
use chrono::{DateTime, Utc};
use moka::notification::RemovalCause;
use moka::ops::compute::{CompResult, Op};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use opscache_domain::value_objects::{CacheEntry, CacheLevel, TierStats};
use opscache_providers::cache::KeyPattern;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct LocalCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
}

/// Called with the key and entry the tier dropped on its own
pub type EvictionHook = Arc<dyn Fn(&str, &CacheEntry) + Send + Sync>;

/// Moka-backed local tier
///
/// Clones share the same entries and counters.
#[derive(Clone)]
pub struct LocalCache {
    cache: Cache<String, CacheEntry>,
    counters: Arc<LocalCounters>,
    on_evict: Option<EvictionHook>,
    max_entries: u64,
}

impl LocalCache {
    /// Create a local tier holding at most `max_entries` entries
    pub fn new(max_entries: u64) -> Self {
        Self::build(max_entries, None)
    }

    /// Like [`LocalCache::new`], calling `on_evict` for every entry dropped
    /// by LRU eviction or expiry
    pub fn with_eviction_hook<F>(max_entries: u64, on_evict: F) -> Self
    where
        F: Fn(&str, &CacheEntry) + Send + Sync + 'static,
    {
        Self::build(max_entries, Some(Arc::new(on_evict)))
    }

    fn build(max_entries: u64, on_evict: Option<EvictionHook>) -> Self {
        let counters = Arc::new(LocalCounters::default());

        let evictions = Arc::clone(&counters);
        let listener_hook = on_evict.clone();
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |key: Arc<String>, value: CacheEntry, cause| {
                // Replacements and explicit removals are not evictions
                if matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    evictions.evictions.fetch_add(1, Ordering::Relaxed);
                    if let Some(hook) = &listener_hook {
                        hook(key.as_str(), &value);
                    }
                }
            })
            .build();

        Self {
            cache,
            counters,
            on_evict,
            max_entries,
        }
    }

    /// Maximum number of entries
    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    /// Read an unexpired entry
    ///
    /// Finding an expired entry removes it, counts an eviction and reports a
    /// miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = Utc::now();
        match self.cache.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(_) => {
                if self.remove_if_expired(key, now) {
                    self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite an entry
    pub fn set(&self, key: &str, entry: CacheEntry) {
        self.cache.insert(key.to_string(), entry);
        // Apply recorded reads and the size bound now, so LRU order is exact
        self.cache.run_pending_tasks();
        self.counters.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove an entry; true when an unexpired entry was present
    pub fn delete(&self, key: &str) -> bool {
        let removed = self
            .cache
            .remove(key)
            .is_some_and(|entry| !entry.is_expired());
        if removed {
            self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop an entry without counting it, e.g. when a newer value went
    /// elsewhere
    pub fn discard(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Remove every entry
    pub fn clear(&self) -> bool {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        true
    }

    /// Unexpired keys matching `pattern`
    pub fn keys_matching(&self, pattern: &KeyPattern) -> Vec<String> {
        let now = Utc::now();
        self.cache
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && pattern.matches(key))
            .map(|(key, _)| key.to_string())
            .collect()
    }

    /// Remove every expired entry, counting each as an eviction
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key)
            .collect();

        let purged = expired
            .iter()
            .filter(|key| self.remove_if_expired(key.as_str(), now))
            .count();
        self.counters
            .evictions
            .fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Number of entries, expired ones included until removed
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Whether the tier holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uncounted read used by health checks; returns its latency
    pub fn probe(&self) -> Duration {
        let started = Instant::now();
        let _ = self.cache.contains_key(LOCAL_CACHE_PROBE_KEY);
        started.elapsed()
    }

    /// Current counters
    pub fn stats(&self) -> TierStats {
        let mut stats = TierStats::new(CacheLevel::Local, LOCAL_CACHE_BACKEND_NAME);
        stats.hits = self.counters.hits.load(Ordering::Relaxed);
        stats.misses = self.counters.misses.load(Ordering::Relaxed);
        stats.sets = self.counters.sets.load(Ordering::Relaxed);
        stats.deletes = self.counters.deletes.load(Ordering::Relaxed);
        stats.evictions = self.counters.evictions.load(Ordering::Relaxed);
        stats.entries = Some(self.len());
        stats
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.hits,
            &self.counters.misses,
            &self.counters.sets,
            &self.counters.deletes,
            &self.counters.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Remove `key` only if the stored entry is still expired at `now`
    ///
    /// A fresh value written concurrently is left alone.
    fn remove_if_expired(&self, key: &str, now: DateTime<Utc>) -> bool {
        let result = self.cache.entry_by_ref(key).and_compute_with(|current| {
            match current {
                Some(entry) if entry.value().is_expired_at(now) => Op::Remove,
                _ => Op::Nop,
            }
        });
        match result {
            CompResult::Removed(removed) => {
                if let Some(hook) = &self.on_evict {
                    hook(key, removed.value());
                }
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("max_entries", &self.max_entries)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
