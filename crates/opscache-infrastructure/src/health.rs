//! Cache health reporting
//!
//! Health types produced by `CacheManager::health_check`. A failing tier never
//! makes the check itself fail; it shows up as a degraded or down report.

use crate::logging::log_health_check;
use chrono::{DateTime, Utc};
use opscache_domain::value_objects::CacheLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Health status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every configured tier is reachable
    Up,
    /// At least one tier is unreachable but another still serves traffic
    Degraded,
    /// No configured tier is reachable
    Down,
}

impl HealthStatus {
    /// Check if the status indicates the cache is healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Up)
    }

    /// Check if the cache is operational (healthy or degraded)
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Up | Self::Degraded)
    }
}

/// Probe result for a single tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierHealth {
    /// Probed tier
    pub level: CacheLevel,
    /// Backend name (e.g. "moka", "redis")
    pub backend: String,
    /// Tier status
    pub status: HealthStatus,
    /// Whether the probe succeeded
    pub reachable: bool,
    /// Probe round trip in milliseconds
    pub latency_ms: u64,
    /// Failure description, if the probe failed
    pub error: Option<String>,
}

impl TierHealth {
    /// A tier that answered its probe
    pub fn reachable<S: Into<String>>(level: CacheLevel, backend: S, latency: Duration) -> Self {
        Self {
            level,
            backend: backend.into(),
            status: HealthStatus::Up,
            reachable: true,
            latency_ms: duration_ms(latency),
            error: None,
        }
    }

    /// A tier whose probe failed
    pub fn unreachable<S: Into<String>>(
        level: CacheLevel,
        backend: S,
        latency: Duration,
        error: String,
    ) -> Self {
        Self {
            level,
            backend: backend.into(),
            status: HealthStatus::Down,
            reachable: false,
            latency_ms: duration_ms(latency),
            error: Some(error),
        }
    }
}

/// Aggregated cache health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealthReport {
    /// Overall status
    pub status: HealthStatus,
    /// When the check ran
    pub timestamp: DateTime<Utc>,
    /// Total time spent probing in milliseconds
    pub response_time_ms: u64,
    /// Per-tier results, in read order
    pub tiers: Vec<TierHealth>,
}

impl Default for CacheHealthReport {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheHealthReport {
    /// Empty report; a report without tiers is `Down`
    pub fn new() -> Self {
        Self {
            status: HealthStatus::Down,
            timestamp: Utc::now(),
            response_time_ms: 0,
            tiers: Vec::new(),
        }
    }

    /// Add a tier result and recompute the overall status
    pub fn add_tier(mut self, tier: TierHealth) -> Self {
        log_health_check(tier.level.as_str(), tier.reachable, tier.error.as_deref());
        self.tiers.push(tier);

        let reachable = self.tiers.iter().filter(|tier| tier.reachable).count();
        self.status = if reachable == self.tiers.len() {
            HealthStatus::Up
        } else if reachable > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Down
        };
        self
    }

    /// Set response time
    pub fn with_response_time(mut self, duration: Duration) -> Self {
        self.response_time_ms = duration_ms(duration);
        self
    }

    /// Result for one tier, if that tier is configured
    pub fn tier(&self, level: CacheLevel) -> Option<&TierHealth> {
        self.tiers.iter().find(|tier| tier.level == level)
    }

    /// Check if the cache is fully healthy
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
