//! # opscache - Provider Implementations
//!
//! Backends for the distributed cache tier. Each provider implements
//! [`DistributedCacheProvider`] from `opscache-domain` and registers itself in
//! the provider registry, so configuration can select it by name.
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! opscache-providers = { version = "0.1", default-features = false }
//! ```
//!
//! | Feature | Provider |
//! |---------|----------|
//! | `cache-redis` (default) | [`cache::RedisCacheProvider`] |
//!
//! [`cache::MemoryCacheProvider`] is always available.
//!
//! ## Usage
//!
//! ```ignore
//! use opscache_providers::cache::{KeyPattern, MemoryCacheProvider};
//! ```

// Re-export opscache-domain types commonly used with providers
pub use opscache_domain::error::{Error, Result};
pub use opscache_domain::ports::providers::{DistributedCacheProvider, KeyStream};

/// Provider-specific constants
pub mod constants;

/// Distributed cache provider implementations
///
/// Implements `DistributedCacheProvider` for caching backends.
pub mod cache;
