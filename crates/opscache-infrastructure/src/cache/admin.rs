//! Administrative cache operations
//!
//! Transport-agnostic adapter that an HTTP or CLI layer can call: it validates
//! admin requests and translates them into [`CacheManager`] calls.

use crate::cache::manager::{CacheManager, SetOptions};
use crate::health::CacheHealthReport;
use opscache_domain::error::{Error, Result};
use opscache_domain::value_objects::{CacheLevel, CacheStatsReport, DataType, Expiration};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// What to invalidate; exactly one selector must be given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationRequest {
    /// Glob pattern over keys
    #[serde(default)]
    pub pattern: Option<String>,
    /// Tag whose keys are removed
    #[serde(default)]
    pub tag: Option<String>,
    /// Single key
    #[serde(default)]
    pub key: Option<String>,
}

/// A validated invalidation selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    /// Every key matching a glob pattern
    Pattern(String),
    /// Every key carrying a tag
    Tag(String),
    /// One key
    Key(String),
}

impl InvalidationRequest {
    /// Invalidate by pattern
    pub fn pattern<S: Into<String>>(pattern: S) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Invalidate by tag
    pub fn tag<S: Into<String>>(tag: S) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    /// Invalidate one key
    pub fn key<S: Into<String>>(key: S) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Validate the request; empty strings count as absent
    pub fn target(self) -> Result<InvalidationTarget> {
        let given = |value: Option<String>| value.filter(|value| !value.is_empty());

        match (given(self.pattern), given(self.tag), given(self.key)) {
            (Some(pattern), None, None) => Ok(InvalidationTarget::Pattern(pattern)),
            (None, Some(tag), None) => Ok(InvalidationTarget::Tag(tag)),
            (None, None, Some(key)) => Ok(InvalidationTarget::Key(key)),
            (None, None, None) => Err(Error::invalid_invalidation_request(
                "One of pattern, tag or key is required",
            )),
            _ => Err(Error::invalid_invalidation_request(
                "Only one of pattern, tag or key may be given",
            )),
        }
    }
}

/// Outcome of an invalidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationResponse {
    /// Selector kind ("pattern", "tag" or "key")
    pub selector: String,
    /// Number of keys removed
    pub removed: usize,
}

/// Admin write request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    /// Target key
    pub key: String,
    /// JSON payload
    pub value: serde_json::Value,
    /// Data type (snake_case name)
    pub data_type: DataType,
    /// TTL override in seconds; `0` means never expires
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    /// Tier override
    #[serde(default)]
    pub levels: Option<Vec<CacheLevel>>,
    /// Tags for the key
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Admin facade over a shared manager
#[derive(Debug, Clone)]
pub struct CacheAdminService {
    manager: Arc<CacheManager>,
}

impl CacheAdminService {
    /// Wrap a shared manager
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    /// Tier health; never fails
    pub async fn health(&self) -> CacheHealthReport {
        self.manager.health_check().await
    }

    /// Live statistics
    pub async fn stats(&self) -> Result<CacheStatsReport> {
        self.manager.get_stats().await
    }

    /// Read a raw JSON value
    pub async fn get(&self, key: &str, data_type: &DataType) -> Result<Option<serde_json::Value>> {
        self.manager.get(key, data_type).await
    }

    /// Write a raw JSON value
    pub async fn set(&self, request: SetRequest) -> Result<bool> {
        let mut options = SetOptions::new().with_tags(request.tags);
        if let Some(ttl_secs) = request.ttl_secs {
            options = options.with_ttl(Expiration::from_secs(ttl_secs));
        }
        if let Some(levels) = request.levels {
            options = options.with_levels(levels);
        }

        self.manager
            .set(&request.key, &request.value, request.data_type, options)
            .await
    }

    /// Remove keys by pattern, tag or single key
    pub async fn invalidate(&self, request: InvalidationRequest) -> Result<InvalidationResponse> {
        let (selector, removed) = match request.target()? {
            InvalidationTarget::Pattern(pattern) => {
                ("pattern", self.manager.invalidate_pattern(&pattern).await?)
            }
            InvalidationTarget::Tag(tag) => ("tag", self.manager.invalidate_by_tag(&tag).await?),
            InvalidationTarget::Key(key) => {
                ("key", usize::from(self.manager.delete(&key).await?))
            }
        };

        info!(selector, removed, "admin invalidation");
        Ok(InvalidationResponse {
            selector: selector.to_string(),
            removed,
        })
    }

    /// Empty both tiers
    pub async fn clear(&self) -> Result<()> {
        info!("admin cache clear");
        self.manager.clear_all().await
    }

    /// Zero the statistics
    pub fn reset_stats(&self) {
        self.manager.reset_stats();
    }
}
