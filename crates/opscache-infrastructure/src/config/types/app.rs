//! Main application configuration

use super::cache::CacheConfig;
use super::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Root configuration document
///
/// ```toml
/// [cache]
/// key_prefix = "ops"
///
/// [cache.distributed]
/// provider = "redis"
/// uri = "redis://cache:6379"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}
