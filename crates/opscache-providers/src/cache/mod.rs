//! Distributed tier stores
//!
//! Backends for the shared cache tier, selected by name from configuration.
//! The local tier lives in `opscache-infrastructure` and needs no store.
//!
//! | Store | Registered as | Use |
//! |-------|---------------|-----|
//! | [`MemoryCacheProvider`] | `memory` | single node, development, outage drills in tests |
//! | [`RedisCacheProvider`] | `redis` | several processes sharing one cache (`cache-redis` feature) |

pub mod memory;
pub mod pattern;
#[cfg(feature = "cache-redis")]
pub mod redis;

pub use memory::MemoryCacheProvider;
pub use pattern::KeyPattern;
#[cfg(feature = "cache-redis")]
pub use redis::RedisCacheProvider;
