//! Two-tier cache manager
//!
//! Routes reads and writes across the local and distributed tiers according
//! to the data-type policy table, maintains the tag index and aggregates
//! statistics and health.
//!
//! ## Read path
//!
//! Local first; on a local miss the distributed tier is read and a hit is
//! copied back into the local tier with the entry's remaining lifetime.
//!
//! ## Write path
//!
//! Every resolved tier is written. The local write and its tag-index update
//! happen before the first `.await`. Without a local tier, tags are recorded
//! only once the distributed write succeeded.
//!
//! ## Degradation
//!
//! A failing distributed tier is logged and skipped. Callers only see
//! `BackendUnavailable` when every tier they asked for failed.

use crate::cache::codec::CacheKeyCodec;
use crate::cache::distributed::DistributedCache;
use crate::cache::local::LocalCache;
use crate::cache::policy::{DataTypePolicy, PolicyTable, normalize_levels};
use crate::cache::tags::{TagIndex, TagLifetime};
use crate::constants::{
    CACHE_DEFAULT_KEY_PREFIX, DISTRIBUTED_CACHE_DEFAULT_TIMEOUT_MS, LOCAL_CACHE_BACKEND_NAME,
    LOCAL_CACHE_DEFAULT_MAX_ENTRIES,
};
use crate::health::{CacheHealthReport, TierHealth};
use opscache_domain::error::{Error, Result};
use opscache_domain::ports::providers::cache::DistributedCacheProvider;
use opscache_domain::value_objects::{
    CacheEntry, CacheLevel, CacheStatsReport, DataType, Expiration,
};
use opscache_providers::cache::KeyPattern;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Keys deleted per distributed round trip during bulk invalidation
const INVALIDATION_BATCH_SIZE: usize = 500;

/// Per-call overrides for [`CacheManager::set`]
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL replacing the policy default
    pub ttl: Option<Expiration>,
    /// Tiers replacing the policy default
    pub levels: Option<Vec<CacheLevel>>,
    /// Tags the key is associated with
    pub tags: BTreeSet<String>,
}

impl SetOptions {
    /// No overrides, no tags
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the TTL
    pub fn with_ttl(mut self, ttl: Expiration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Override the tier set
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = CacheLevel>) -> Self {
        self.levels = Some(levels.into_iter().collect());
        self
    }

    /// Add a tag
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add several tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Outcome of a batched distributed delete
#[derive(Debug, Clone, Copy)]
struct BulkDelete {
    removed: u64,
    /// Every batch went through
    complete: bool,
}

#[derive(Debug, Default)]
struct ManagerCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    repopulations: AtomicU64,
}

impl ManagerCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.sets,
            &self.deletes,
            &self.repopulations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Two-tier cache manager
///
/// Construct once through [`CacheManager::builder`] or
/// [`crate::cache::build_cache_manager`], share as `Arc<CacheManager>` and close
/// with [`CacheManager::shutdown`].
pub struct CacheManager {
    enabled: bool,
    key_prefix: String,
    local: LocalCache,
    distributed: Option<DistributedCache>,
    policies: PolicyTable,
    tags: Arc<TagIndex>,
    counters: ManagerCounters,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl CacheManager {
    /// Start building a manager
    pub fn builder() -> CacheManagerBuilder {
        CacheManagerBuilder::default()
    }

    /// Whether calls currently reach the tiers
    pub fn is_active(&self) -> bool {
        self.enabled && !self.shut_down.load(Ordering::Acquire)
    }

    /// Prefix used for keys built by [`CacheManager::key`]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Build `prefix:name:sha256(args)` with this manager's prefix
    pub fn key<A: Serialize + ?Sized>(&self, name: &str, args: &A) -> Result<String> {
        CacheKeyCodec::key(&self.key_prefix, name, args)
    }

    /// Policy applying to `data_type`
    pub fn policy(&self, data_type: &DataType) -> &DataTypePolicy {
        self.policies.resolve(data_type)
    }

    /// The local tier
    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// The distributed tier, when configured
    pub fn distributed(&self) -> Option<&DistributedCache> {
        self.distributed.as_ref()
    }

    /// Tags currently associated with `key`
    pub fn tags_of(&self, key: &str) -> BTreeSet<String> {
        self.tags.tags_of(key)
    }

    /// Keys currently associated with `tag`
    pub fn keys_for_tag(&self, tag: &str) -> Vec<String> {
        self.tags.prune_expired(Utc::now());
        self.tags.keys_for(tag)
    }

    /// Resolve the tier set of a call, restricted to configured tiers
    fn resolve_levels(
        &self,
        data_type: &DataType,
        requested: Option<&[CacheLevel]>,
    ) -> Vec<CacheLevel> {
        let levels = requested.unwrap_or(&self.policies.resolve(data_type).levels);
        normalize_levels(
            levels
                .iter()
                .copied()
                .filter(|level| *level == CacheLevel::Local || self.distributed.is_some()),
        )
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read `key` through the tiers of `data_type`'s policy
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        data_type: &DataType,
    ) -> Result<Option<T>> {
        self.get_with(key, data_type, None).await
    }

    /// Read `key` through the given tiers, or the policy's when `None`
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        key: &str,
        data_type: &DataType,
        levels: Option<&[CacheLevel]>,
    ) -> Result<Option<T>> {
        match self.get_entry(key, data_type, levels).await? {
            Some(entry) => CacheKeyCodec::from_value(entry.value).map(Some),
            None => Ok(None),
        }
    }

    /// Read the stored entry envelope
    pub async fn get_entry(
        &self,
        key: &str,
        data_type: &DataType,
        levels: Option<&[CacheLevel]>,
    ) -> Result<Option<CacheEntry>> {
        if !self.is_active() {
            return Ok(None);
        }

        let levels = self.resolve_levels(data_type, levels);
        let use_local = levels.contains(&CacheLevel::Local);

        if use_local && let Some(entry) = self.local.get(key) {
            ManagerCounters::bump(&self.counters.hits);
            debug!(key, level = "local", "cache hit");
            return Ok(Some(entry));
        }

        let mut unavailable = None;
        if levels.contains(&CacheLevel::Distributed)
            && let Some(distributed) = &self.distributed
        {
            match distributed.get(key).await {
                Ok(Some(entry)) => {
                    if use_local {
                        self.repopulate(key, &entry);
                    }
                    ManagerCounters::bump(&self.counters.hits);
                    debug!(key, level = "distributed", "cache hit");
                    return Ok(Some(entry));
                }
                Ok(None) => {}
                Err(err) if err.is_backend_unavailable() => {
                    warn!(key, error = %err, "distributed cache read failed");
                    unavailable = Some(err);
                }
                Err(err) => {
                    warn!(key, error = %err, "discarding unreadable distributed cache entry");
                }
            }
        }

        // Local never fails, so only a distributed-only read can fail as a whole
        if let (false, Some(err)) = (use_local, unavailable) {
            return Err(err);
        }

        ManagerCounters::bump(&self.counters.misses);
        debug!(key, "cache miss");
        Ok(None)
    }

    /// Copy a distributed hit into the local tier, keeping its absolute expiry
    fn repopulate(&self, key: &str, entry: &CacheEntry) {
        if entry.remaining().is_none() {
            return;
        }
        if !entry.tags.is_empty() {
            self.tags
                .set_tags(key, &entry.tags, TagLifetime::shared(entry.expires_at));
        }
        self.local.set(key, entry.clone());
        ManagerCounters::bump(&self.counters.repopulations);
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write `value` to every resolved tier
    ///
    /// Returns `Ok(false)` when caching is disabled or no tier applies and
    /// `Ok(true)` when at least one tier stored the value.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        data_type: DataType,
        options: SetOptions,
    ) -> Result<bool> {
        if !self.is_active() {
            return Ok(false);
        }
        CacheKeyCodec::validate_key(key)?;

        let levels = self.resolve_levels(&data_type, options.levels.as_deref());
        if levels.is_empty() {
            return Ok(false);
        }
        let use_local = levels.contains(&CacheLevel::Local);
        let use_distributed = levels.contains(&CacheLevel::Distributed);

        let ttl = options
            .ttl
            .unwrap_or(self.policies.resolve(&data_type).ttl);
        let entry = CacheEntry::new(
            CacheKeyCodec::to_value(value)?,
            data_type,
            ttl,
            options.tags,
        );
        let payload = if use_distributed {
            Some(CacheKeyCodec::encode(&entry)?)
        } else {
            None
        };

        let mut stored = 0usize;
        if use_local {
            let lifetime = if use_distributed {
                TagLifetime::shared(entry.expires_at)
            } else {
                TagLifetime::local(entry.expires_at)
            };
            self.tags.set_tags(key, &entry.tags, lifetime);
            self.local.set(key, entry.clone());
            stored += 1;
        } else {
            // A local copy would shadow the newer value
            self.local.discard(key);
        }

        let mut failure = None;
        if let (Some(payload), Some(distributed)) = (payload, &self.distributed) {
            match distributed.set_encoded(key, &payload, ttl).await {
                Ok(()) => {
                    if !use_local {
                        self.tags
                            .set_tags(key, &entry.tags, TagLifetime::shared(entry.expires_at));
                    }
                    stored += 1;
                }
                Err(err) => {
                    warn!(key, error = %err, "distributed cache write failed");
                    if use_local {
                        // Only the local copy exists now
                        self.tags
                            .set_tags(key, &entry.tags, TagLifetime::local(entry.expires_at));
                    }
                    failure = Some(err);
                }
            }
        }

        if stored == 0 {
            return Err(failure
                .unwrap_or_else(|| Error::internal("No cache tier accepted the write")));
        }

        ManagerCounters::bump(&self.counters.sets);
        debug!(key, ?levels, "cache set");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Delete `key` from every tier; true when any tier held it
    pub async fn delete(&self, key: &str) -> Result<bool> {
        if !self.is_active() {
            return Ok(false);
        }

        let mut removed = false;
        if let Some(distributed) = &self.distributed {
            match distributed.delete(key).await {
                Ok(existed) => removed |= existed,
                Err(err) => warn!(key, error = %err, "distributed cache delete failed"),
            }
        }

        removed |= self.local.delete(key);
        self.tags.remove_key(key);

        if removed {
            ManagerCounters::bump(&self.counters.deletes);
        }
        Ok(removed)
    }

    /// Delete every key matching a glob `pattern` from both tiers
    ///
    /// Returns the number of distinct keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let matcher = KeyPattern::new(pattern)?;
        if !self.is_active() {
            return Ok(0);
        }

        let mut keys: BTreeSet<String> = self.local.keys_matching(&matcher).into_iter().collect();
        let mut distributed_ok = true;
        if let Some(distributed) = &self.distributed {
            match distributed.scan_keys(pattern).await {
                Ok(found) => keys.extend(found),
                Err(err) => {
                    warn!(pattern, error = %err, "distributed cache scan failed");
                    distributed_ok = false;
                }
            }
        }

        let keys: Vec<String> = keys.into_iter().collect();
        if keys.is_empty() {
            return Ok(0);
        }

        if distributed_ok {
            self.delete_distributed(&keys).await;
        }
        for key in &keys {
            self.local.delete(key);
        }
        self.tags.remove_keys(&keys);

        info!(pattern, removed = keys.len(), "invalidated cache pattern");
        Ok(keys.len())
    }

    /// Delete every key associated with `tag` from both tiers
    ///
    /// Returns the number of keys a tier actually removed; an unknown tag
    /// returns 0 and changes nothing.
    pub async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        if !self.is_active() {
            return Ok(0);
        }

        self.tags.prune_expired(Utc::now());
        let keys = self.tags.keys_for(tag);
        if keys.is_empty() {
            return Ok(0);
        }

        let (shared, local_only): (Vec<String>, Vec<String>) = keys
            .iter()
            .cloned()
            .partition(|key| !self.tags.is_local_only(key));
        let distributed = self.delete_distributed(&shared).await;

        // Shared keys are counted by the distributed tier unless it failed
        let mut removed = local_only
            .iter()
            .filter(|key| self.local.delete(key))
            .count();
        let shared_local = shared.iter().filter(|key| self.local.delete(key)).count();
        removed += match distributed {
            Some(outcome) if outcome.complete => outcome.removed as usize,
            Some(outcome) => (outcome.removed as usize).max(shared_local),
            None => shared_local,
        };
        // Only the snapshot: keys tagged meanwhile stay indexed
        self.tags.remove_keys(&keys);

        let removed = removed.min(keys.len());
        info!(tag, removed, "invalidated cache tag");
        Ok(removed)
    }

    /// Delete `keys` from the distributed tier in batches
    ///
    /// `None` when there is no distributed tier.
    async fn delete_distributed(&self, keys: &[String]) -> Option<BulkDelete> {
        let distributed = self.distributed.as_ref()?;
        let mut outcome = BulkDelete {
            removed: 0,
            complete: true,
        };
        for batch in keys.chunks(INVALIDATION_BATCH_SIZE) {
            match distributed.delete_many(batch).await {
                Ok(removed) => outcome.removed += removed,
                Err(err) => {
                    warn!(error = %err, "distributed cache bulk delete failed");
                    outcome.complete = false;
                    break;
                }
            }
        }
        Some(outcome)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Probe every configured tier
    ///
    /// Never fails: an unreachable tier shows up in the report.
    pub async fn health_check(&self) -> CacheHealthReport {
        let started = Instant::now();
        let mut report = CacheHealthReport::new();
        if self.shut_down.load(Ordering::Acquire) {
            return report;
        }

        report = report.add_tier(TierHealth::reachable(
            CacheLevel::Local,
            LOCAL_CACHE_BACKEND_NAME,
            self.local.probe(),
        ));

        if let Some(distributed) = &self.distributed {
            let probe_started = Instant::now();
            let tier = match distributed.ping().await {
                Ok(latency) => {
                    TierHealth::reachable(CacheLevel::Distributed, distributed.backend(), latency)
                }
                Err(err) => TierHealth::unreachable(
                    CacheLevel::Distributed,
                    distributed.backend(),
                    probe_started.elapsed(),
                    err.to_string(),
                ),
            };
            report = report.add_tier(tier);
        }

        report.with_response_time(started.elapsed())
    }

    /// Statistics computed from live counters
    pub async fn get_stats(&self) -> Result<CacheStatsReport> {
        let mut report = CacheStatsReport::new(
            self.counters.hits.load(Ordering::Relaxed),
            self.counters.misses.load(Ordering::Relaxed),
        );
        report.sets = self.counters.sets.load(Ordering::Relaxed);
        report.deletes = self.counters.deletes.load(Ordering::Relaxed);
        report.repopulations = self.counters.repopulations.load(Ordering::Relaxed);
        self.tags.prune_expired(Utc::now());
        report.tags = self.tags.tag_count() as u64;

        let local = self.local.stats();
        report.evictions = local.evictions;
        report.local_size = local.entries.unwrap_or_default();
        report.tiers.push(local);

        if let Some(distributed) = &self.distributed {
            let mut tier = distributed.stats();
            match distributed.size().await {
                Ok(size) => {
                    tier.entries = Some(size);
                    report.distributed_size = Some(size);
                }
                Err(err) => debug!(error = %err, "distributed cache size unavailable"),
            }
            report.tiers.push(tier);
        }

        Ok(report)
    }

    /// Empty both tiers and the tag index
    pub async fn clear_all(&self) -> Result<()> {
        let distributed = match &self.distributed {
            Some(distributed) => distributed.clear().await,
            None => Ok(()),
        };

        self.local.clear();
        self.tags.clear();
        info!("cache cleared");
        distributed
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        self.counters.reset();
        self.local.reset_stats();
        if let Some(distributed) = &self.distributed {
            distributed.reset_stats();
        }
    }

    /// Stop the sweeper and close the tiers
    ///
    /// Later calls behave as misses and skipped writes.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.stop_sweeper();
        self.local.clear();
        self.tags.clear();
        if let Some(distributed) = &self.distributed {
            distributed.close().await?;
        }
        info!("cache manager shut down");
        Ok(())
    }

    fn stop_sweeper(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("enabled", &self.enabled)
            .field("key_prefix", &self.key_prefix)
            .field("local", &self.local)
            .field("distributed", &self.distributed)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CacheManager`]
pub struct CacheManagerBuilder {
    enabled: bool,
    key_prefix: String,
    local_capacity: u64,
    sweep_interval: Option<Duration>,
    distributed: Option<Arc<dyn DistributedCacheProvider>>,
    distributed_timeout: Duration,
    policies: PolicyTable,
}

impl Default for CacheManagerBuilder {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: CACHE_DEFAULT_KEY_PREFIX.to_string(),
            local_capacity: LOCAL_CACHE_DEFAULT_MAX_ENTRIES,
            sweep_interval: None,
            distributed: None,
            distributed_timeout: Duration::from_millis(DISTRIBUTED_CACHE_DEFAULT_TIMEOUT_MS),
            policies: PolicyTable::default(),
        }
    }
}

impl CacheManagerBuilder {
    /// Enable or disable caching altogether
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Prefix for keys built by the manager
    pub fn key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Maximum number of local entries
    pub fn local_capacity(mut self, max_entries: u64) -> Self {
        self.local_capacity = max_entries;
        self
    }

    /// Run the local expiry sweep every `interval`; zero disables it
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Use `provider` as the distributed tier
    pub fn distributed(mut self, provider: Arc<dyn DistributedCacheProvider>) -> Self {
        self.distributed = Some(provider);
        self
    }

    /// Timeout of one distributed call
    pub fn distributed_timeout(mut self, timeout: Duration) -> Self {
        self.distributed_timeout = timeout;
        self
    }

    /// Replace the whole policy table
    pub fn policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Register or replace one data type's policy
    pub fn policy(mut self, data_type: DataType, policy: DataTypePolicy) -> Self {
        self.policies = self.policies.with_policy(data_type, policy);
        self
    }

    /// Build the manager
    ///
    /// The sweep task is only started when called inside a Tokio runtime.
    pub fn build(self) -> Result<CacheManager> {
        if self.local_capacity == 0 {
            return Err(Error::configuration("Local cache capacity cannot be 0"));
        }
        if self.distributed.is_some() && self.distributed_timeout.is_zero() {
            return Err(Error::configuration("Distributed cache timeout cannot be 0"));
        }

        let tags = Arc::new(TagIndex::new());
        let evicted = Arc::clone(&tags);
        let local = LocalCache::with_eviction_hook(self.local_capacity, move |key, entry| {
            evicted.forget_local(key, entry.expires_at);
        });
        let sweeper = self
            .sweep_interval
            .and_then(|interval| spawn_sweeper(local.clone(), Arc::clone(&tags), interval));

        let distributed = self
            .distributed
            .map(|provider| DistributedCache::new(provider, self.distributed_timeout));

        info!(
            enabled = self.enabled,
            local_capacity = self.local_capacity,
            distributed = distributed.as_ref().map(DistributedCache::backend),
            "cache manager initialized"
        );

        Ok(CacheManager {
            enabled: self.enabled,
            key_prefix: self.key_prefix,
            local,
            distributed,
            policies: self.policies,
            tags,
            counters: ManagerCounters::default(),
            sweeper: Mutex::new(sweeper),
            shut_down: AtomicBool::new(false),
        })
    }
}

/// Periodically purge expired local entries and expired tag associations
fn spawn_sweeper(
    local: LocalCache,
    tags: Arc<TagIndex>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no Tokio runtime, local cache sweep disabled");
        return None;
    };

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = local.purge_expired();
            let untagged = tags.prune_expired(Utc::now());
            if purged > 0 || untagged > 0 {
                debug!(purged, untagged, "swept expired local cache entries");
            }
        }
    }))
}
