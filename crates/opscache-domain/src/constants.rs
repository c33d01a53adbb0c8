//! Domain constants
//!
//! Values shared by every tier. Infrastructure defaults live in
//! `opscache_infrastructure::constants`.

/// Separator between key segments (`prefix:name:hash`)
pub const CACHE_KEY_SEPARATOR: &str = ":";

/// Maximum key length accepted by both tiers
pub const CACHE_KEY_MAX_LENGTH: usize = 250;

/// Default TTL applied when no policy says otherwise (10 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// TTL value that means "never expires" in configuration
pub const NO_EXPIRY_TTL_SECS: u64 = 0;
