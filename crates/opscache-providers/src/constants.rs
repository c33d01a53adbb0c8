//! Provider Constants
//!
//! Constants specific to provider implementations. Domain constants live in
//! `opscache_domain::constants`.

// ============================================================================
// REDIS PROVIDER CONSTANTS
// ============================================================================

/// Default Redis connection URI
pub const REDIS_DEFAULT_URI: &str = "redis://localhost:6379";

/// Keys requested per SCAN round trip
pub const REDIS_SCAN_COUNT: usize = 500;

/// Keys deleted per DEL batch when clearing a prefixed keyspace
pub const REDIS_DELETE_BATCH_SIZE: usize = 500;

// ============================================================================
// MEMORY PROVIDER CONSTANTS
// ============================================================================

/// Backend name reported by the memory provider
pub const MEMORY_PROVIDER_NAME: &str = "memory";

/// Backend name reported by the Redis provider
pub const REDIS_PROVIDER_NAME: &str = "redis";
