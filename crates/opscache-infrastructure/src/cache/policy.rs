//! Data-type policies
//!
//! Every data type resolves to exactly one policy: its own when registered,
//! the default one otherwise.

use crate::config::{CacheConfig, PolicyConfig};
use opscache_domain::value_objects::{CacheLevel, DataType, Expiration};
use std::collections::{BTreeSet, HashMap};

/// Default TTL and tier set for a data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypePolicy {
    /// TTL applied when the caller gives none
    pub ttl: Expiration,
    /// Tiers used when the caller gives none, in read order
    pub levels: Vec<CacheLevel>,
}

impl DataTypePolicy {
    /// Create a policy; tiers are deduplicated and put in read order
    pub fn new(ttl: Expiration, levels: impl IntoIterator<Item = CacheLevel>) -> Self {
        Self {
            ttl,
            levels: normalize_levels(levels),
        }
    }
}

impl From<&PolicyConfig> for DataTypePolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self::new(
            Expiration::from_secs(config.ttl_secs),
            config.levels.iter().copied(),
        )
    }
}

/// Lookup table from data type to policy
#[derive(Debug, Clone)]
pub struct PolicyTable {
    default: DataTypePolicy,
    policies: HashMap<DataType, DataTypePolicy>,
}

impl PolicyTable {
    /// Table with only a default policy
    pub fn new(default: DataTypePolicy) -> Self {
        Self {
            default,
            policies: HashMap::new(),
        }
    }

    /// Table described by the cache configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        config.policies.iter().fold(
            Self::new(DataTypePolicy::from(&config.default_policy)),
            |table, (data_type, policy)| {
                table.with_policy(data_type.clone(), DataTypePolicy::from(policy))
            },
        )
    }

    /// Register or replace the policy of a data type
    pub fn with_policy(mut self, data_type: DataType, policy: DataTypePolicy) -> Self {
        self.policies.insert(data_type, policy);
        self
    }

    /// Replace the default policy
    pub fn with_default(mut self, default: DataTypePolicy) -> Self {
        self.default = default;
        self
    }

    /// Policy applying to `data_type`
    pub fn resolve(&self, data_type: &DataType) -> &DataTypePolicy {
        self.policies.get(data_type).unwrap_or(&self.default)
    }

    /// The fallback policy
    pub fn default_policy(&self) -> &DataTypePolicy {
        &self.default
    }
}

impl Default for PolicyTable {
    /// Built-in policies
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// Deduplicate tiers and sort them in read order (local first)
pub(crate) fn normalize_levels(levels: impl IntoIterator<Item = CacheLevel>) -> Vec<CacheLevel> {
    levels
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
