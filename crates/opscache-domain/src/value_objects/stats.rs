//! Cache statistics value objects

use super::cache::CacheLevel;
use serde::{Deserialize, Serialize};

/// Counters for a single tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierStats {
    /// Which tier these counters belong to
    pub level: CacheLevel,
    /// Backend name (e.g. "moka", "redis", "memory")
    pub backend: String,
    /// Number of hits served by this tier
    pub hits: u64,
    /// Number of misses observed by this tier
    pub misses: u64,
    /// Number of successful writes
    pub sets: u64,
    /// Number of deletes that removed an entry
    pub deletes: u64,
    /// Number of entries evicted for size or expiry
    pub evictions: u64,
    /// Number of operations that failed at the transport level
    pub errors: u64,
    /// Current number of entries, when the tier could report it
    pub entries: Option<u64>,
}

impl TierStats {
    /// Create empty counters for a tier
    pub fn new<S: Into<String>>(level: CacheLevel, backend: S) -> Self {
        Self {
            level,
            backend: backend.into(),
            hits: 0,
            misses: 0,
            sets: 0,
            deletes: 0,
            evictions: 0,
            errors: 0,
            entries: None,
        }
    }

    /// Hit rate of this tier (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.hits + self.misses)
    }
}

/// Aggregated statistics for the whole cache
///
/// Always computed from live counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStatsReport {
    /// Lookups answered from any tier
    pub hits: u64,
    /// Lookups answered by no tier
    pub misses: u64,
    /// `hits + misses`
    pub total_requests: u64,
    /// `hits / total_requests` (0.0 when there were no requests)
    pub hit_rate: f64,
    /// `misses / total_requests` (0.0 when there were no requests)
    pub miss_rate: f64,
    /// Successful `set` calls
    pub sets: u64,
    /// `delete` calls that removed a key from at least one tier
    pub deletes: u64,
    /// Local-tier evictions (size and expiry)
    pub evictions: u64,
    /// Distributed hits copied back into the local tier
    pub repopulations: u64,
    /// Number of entries currently in the local tier
    pub local_size: u64,
    /// Number of keys in the distributed tier, if reachable
    pub distributed_size: Option<u64>,
    /// Number of tags currently indexed
    pub tags: u64,
    /// Per-tier breakdown
    pub tiers: Vec<TierStats>,
}

impl CacheStatsReport {
    /// Create a report from manager-level counters
    pub fn new(hits: u64, misses: u64) -> Self {
        let total_requests = hits + misses;
        Self {
            hits,
            misses,
            total_requests,
            hit_rate: ratio(hits, total_requests),
            miss_rate: ratio(misses, total_requests),
            sets: 0,
            deletes: 0,
            evictions: 0,
            repopulations: 0,
            local_size: 0,
            distributed_size: None,
            tags: 0,
            tiers: Vec::new(),
        }
    }

    /// Counters of one tier, if that tier is configured
    pub fn tier(&self, level: CacheLevel) -> Option<&TierStats> {
        self.tiers.iter().find(|tier| tier.level == level)
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64
    } else {
        0.0
    }
}
