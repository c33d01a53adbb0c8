//! Value objects shared by the cache tiers and the manager

pub mod cache;
pub mod stats;

pub use cache::{CacheEntry, CacheLevel, DataType, Expiration};
pub use stats::{CacheStatsReport, TierStats};
