//! # opscache
//!
//! A two-tier cache for operations platforms: a bounded in-process LRU tier in
//! front of a shared Redis tier, with per data type TTL and tier policies, tag
//! and pattern invalidation, health and live statistics.
//!
//! ## Features
//!
//! - **Two tiers**: local hits never leave the process; local misses fall
//!   through to the shared tier and are copied back with their remaining TTL
//! - **Policies**: each data type resolves to a TTL and a tier set
//! - **Invalidation**: by key, glob pattern or tag
//! - **Degradation**: an unreachable shared tier is logged and skipped
//!
//! ## Example
//!
//! ```ignore
//! use opscache::prelude::*;
//!
//! let config = ConfigLoader::new().load()?;
//! init_logging(config.logging.clone())?;
//! let cache = build_cache_manager(&config.cache)?;
//!
//! cache
//!     .set(
//!         "user:42",
//!         &serde_json::json!({"name": "Ada"}),
//!         DataType::ComputedResult,
//!         SetOptions::new().with_tag("user:42"),
//!     )
//!     .await?;
//!
//! let user: Option<serde_json::Value> = cache.get("user:42", &DataType::ComputedResult).await?;
//! cache.invalidate_by_tag("user:42").await?;
//! cache.shutdown().await?;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - Errors, value objects and the distributed provider port
//! - `providers` - Redis and in-process memory stores
//! - `infrastructure` - Tiers, manager, configuration, logging and health

/// Domain layer - errors, value objects and ports
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use opscache_domain::*;
}

/// Provider layer - distributed store implementations
///
/// Re-exports from the providers crate for convenience
pub mod providers {
    pub use opscache_providers::*;
}

/// Infrastructure layer - cache manager, config, logging and health
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use opscache_infrastructure::*;
}

// Re-export commonly used domain types at the crate root
pub use domain::*;

// Re-export the cache entry points at the crate root
pub use infrastructure::cache::{
    CacheAdminService, CacheKeyCodec, CacheManager, CacheManagerBuilder, SetOptions,
    build_cache_manager, memoize,
};

/// Everything needed to configure, build and use a cache manager
pub mod prelude {
    pub use crate::domain::ports::DistributedCacheProvider;
    pub use crate::domain::{CacheLevel, DataType, Error, Expiration, Result};
    pub use crate::infrastructure::cache::{
        CacheManager, SetOptions, build_cache_manager, memoize,
    };
    pub use crate::infrastructure::config::{AppConfig, CacheConfig, ConfigLoader};
    pub use crate::infrastructure::health::{CacheHealthReport, HealthStatus};
    pub use crate::infrastructure::logging::init_logging;
}
