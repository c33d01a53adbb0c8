//! Cache configuration types

use crate::constants::{
    API_RESPONSE_TTL_SECS, CACHE_DEFAULT_KEY_PREFIX, COMPUTED_RESULT_TTL_SECS, DASHBOARD_TTL_SECS,
    DISTRIBUTED_CACHE_DEFAULT_TIMEOUT_MS, LOCAL_CACHE_DEFAULT_MAX_ENTRIES,
    LOCAL_CACHE_DEFAULT_SWEEP_INTERVAL_SECS, PROMETHEUS_QUERY_TTL_SECS, RBAC_DECISION_TTL_SECS,
    SESSION_DATA_TTL_SECS,
};
use opscache_domain::constants::DEFAULT_CACHE_TTL_SECS;
use opscache_domain::value_objects::{CacheLevel, DataType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TTL and tier set for one data type
///
/// A `ttl_secs` of `0` means the entry never expires by time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Default TTL in seconds
    pub ttl_secs: u64,
    /// Tiers written and read by default
    pub levels: Vec<CacheLevel>,
}

impl PolicyConfig {
    /// Policy using both tiers
    pub fn two_tier(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            levels: CacheLevel::ALL.to_vec(),
        }
    }

    /// Policy using a single tier
    pub fn single_tier(ttl_secs: u64, level: CacheLevel) -> Self {
        Self {
            ttl_secs,
            levels: vec![level],
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::two_tier(DEFAULT_CACHE_TTL_SECS)
    }
}

/// Local tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTierConfig {
    /// Maximum number of entries before LRU eviction
    pub max_entries: u64,
    /// Interval of the background expiry sweep in seconds (0 disables it)
    pub sweep_interval_secs: u64,
}

impl Default for LocalTierConfig {
    fn default() -> Self {
        Self {
            max_entries: LOCAL_CACHE_DEFAULT_MAX_ENTRIES,
            sweep_interval_secs: LOCAL_CACHE_DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Distributed tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributedTierConfig {
    /// Registered provider name ("redis", "memory")
    pub provider: String,
    /// Connection URI
    pub uri: Option<String>,
    /// Timeout for a single call in milliseconds
    pub timeout_ms: u64,
    /// Prefix namespacing this cache inside a shared store
    pub key_prefix: Option<String>,
}

impl Default for DistributedTierConfig {
    fn default() -> Self {
        Self {
            provider: "redis".to_string(),
            uri: None,
            timeout_ms: DISTRIBUTED_CACHE_DEFAULT_TIMEOUT_MS,
            key_prefix: None,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache enabled
    pub enabled: bool,

    /// Prefix of keys built by the codec
    pub key_prefix: String,

    /// Local tier settings
    pub local: LocalTierConfig,

    /// Distributed tier settings; the cache is local-only when absent
    pub distributed: Option<DistributedTierConfig>,

    /// Policy for data types without an entry in `policies`
    pub default_policy: PolicyConfig,

    /// Per data type policies
    pub policies: BTreeMap<DataType, PolicyConfig>,
}

impl CacheConfig {
    /// Built-in policy table
    pub fn builtin_policies() -> BTreeMap<DataType, PolicyConfig> {
        use CacheLevel::{Distributed, Local};

        BTreeMap::from([
            (
                DataType::ApiResponse,
                PolicyConfig::two_tier(API_RESPONSE_TTL_SECS),
            ),
            (
                DataType::ComputedResult,
                PolicyConfig::two_tier(COMPUTED_RESULT_TTL_SECS),
            ),
            (
                DataType::SessionData,
                PolicyConfig::single_tier(SESSION_DATA_TTL_SECS, Distributed),
            ),
            (DataType::Dashboard, PolicyConfig::two_tier(DASHBOARD_TTL_SECS)),
            (
                DataType::RbacDecision,
                PolicyConfig::single_tier(RBAC_DECISION_TTL_SECS, Local),
            ),
            (
                DataType::PrometheusQuery,
                PolicyConfig::two_tier(PROMETHEUS_QUERY_TTL_SECS),
            ),
        ])
    }

    /// Use the given distributed tier
    pub fn with_distributed(mut self, distributed: DistributedTierConfig) -> Self {
        self.distributed = Some(distributed);
        self
    }

    /// Override the policy of one data type
    pub fn with_policy(mut self, data_type: DataType, policy: PolicyConfig) -> Self {
        self.policies.insert(data_type, policy);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: CACHE_DEFAULT_KEY_PREFIX.to_string(),
            local: LocalTierConfig::default(),
            distributed: None,
            default_policy: PolicyConfig::default(),
            policies: Self::builtin_policies(),
        }
    }
}
