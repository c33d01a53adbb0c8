//! Cache value objects
//!
//! Tiers, data-type classifications, expiration and the entry envelope that
//! both tiers store.

use crate::constants::NO_EXPIRY_TTL_SECS;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One of the two backing stores composing the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLevel {
    /// In-process tier, fastest, lost on restart
    Local,
    /// Shared tier behind a network round trip
    Distributed,
}

impl CacheLevel {
    /// Both tiers, in read order
    pub const ALL: [CacheLevel; 2] = [CacheLevel::Local, CacheLevel::Distributed];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Distributed => "distributed",
        }
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of cached content, used to pick TTL and tiers
///
/// The textual form is snake_case. Strings that match no built-in
/// classification parse to [`DataType::Custom`] and resolve to the default
/// policy unless one is registered for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    /// Serialized API responses
    ApiResponse,
    /// Results of expensive computations
    ComputedResult,
    /// Per-session state
    SessionData,
    /// Dashboard panels and aggregates
    Dashboard,
    /// RBAC permission check outcomes
    RbacDecision,
    /// Prometheus query results
    PrometheusQuery,
    /// Any other classification
    Custom(String),
}

impl DataType {
    /// Textual name of the data type
    pub fn as_str(&self) -> &str {
        match self {
            Self::ApiResponse => "api_response",
            Self::ComputedResult => "computed_result",
            Self::SessionData => "session_data",
            Self::Dashboard => "dashboard",
            Self::RbacDecision => "rbac_decision",
            Self::PrometheusQuery => "prometheus_query",
            Self::Custom(name) => name,
        }
    }
}

impl FromStr for DataType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "api_response" => Self::ApiResponse,
            "computed_result" => Self::ComputedResult,
            "session_data" => Self::SessionData,
            "dashboard" => Self::Dashboard,
            "rbac_decision" => Self::RbacDecision,
            "prometheus_query" => Self::PrometheusQuery,
            _ => Self::Custom(s.to_string()),
        })
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(data_type) => data_type,
            Err(never) => match never {},
        }
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long an entry lives
///
/// `Never` is explicit: a zero TTL is never read as "expire immediately".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Expires after the given duration
    After(Duration),
    /// Never expires by time (may still be evicted for size)
    Never,
}

impl Expiration {
    /// Build from a duration; a zero duration means `Never`
    pub fn after(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Self::Never
        } else {
            Self::After(ttl)
        }
    }

    /// Build from configuration seconds; `0` means `Never`
    pub fn from_secs(secs: u64) -> Self {
        if secs == NO_EXPIRY_TTL_SECS {
            Self::Never
        } else {
            Self::After(Duration::from_secs(secs))
        }
    }

    /// The finite TTL, if any
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::After(ttl) if !ttl.is_zero() => Some(*ttl),
            _ => None,
        }
    }

    /// Whether this expiration is finite
    pub fn is_finite(&self) -> bool {
        self.as_duration().is_some()
    }
}

/// Entry envelope stored by both tiers
///
/// `expires_at` is absent for entries that never expire by time. When present
/// it is always strictly after `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Serialized payload
    pub value: serde_json::Value,
    /// Classification of the payload
    pub data_type: DataType,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Absolute expiry, if finite
    pub expires_at: Option<DateTime<Utc>>,
    /// Invalidation groups this entry belongs to
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl CacheEntry {
    /// Create an entry created now
    pub fn new(
        value: serde_json::Value,
        data_type: DataType,
        expiration: Expiration,
        tags: BTreeSet<String>,
    ) -> Self {
        Self::created_at(value, data_type, expiration, tags, Utc::now())
    }

    /// Create an entry with an explicit creation time
    pub fn created_at(
        value: serde_json::Value,
        data_type: DataType,
        expiration: Expiration,
        tags: BTreeSet<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = expiration
            .as_duration()
            .and_then(|ttl| TimeDelta::from_std(ttl).ok())
            .and_then(|delta| created_at.checked_add_signed(delta));

        Self {
            value,
            data_type,
            created_at,
            expires_at,
            tags,
        }
    }

    /// Whether the entry is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Whether the entry is expired now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Remaining lifetime at `now`
    ///
    /// Returns `None` once the entry has expired; `Some(Expiration::Never)` for
    /// entries without a finite TTL.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Expiration> {
        match self.expires_at {
            None => Some(Expiration::Never),
            Some(expires_at) => (expires_at - now)
                .to_std()
                .ok()
                .filter(|remaining| !remaining.is_zero())
                .map(Expiration::After),
        }
    }

    /// Remaining lifetime now
    pub fn remaining(&self) -> Option<Expiration> {
        self.remaining_at(Utc::now())
    }
}
