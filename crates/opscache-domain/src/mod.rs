//! # opscache - Domain Layer
//!
//! Core types for the two-tier cache: errors, value objects and the port
//! that distributed cache providers implement.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error taxonomy shared by every layer |
//! | [`value_objects`] | Cache levels, data types, entries, statistics |
//! | [`ports`] | `DistributedCacheProvider` port and provider registry |
//! | [`constants`] | Key format and TTL constants |

pub mod constants;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use error::{Error, Result};
pub use value_objects::{CacheEntry, CacheLevel, CacheStatsReport, DataType, Expiration, TierStats};
