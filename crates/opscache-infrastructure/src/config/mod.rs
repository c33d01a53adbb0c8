//! Configuration management
//!
//! Layered configuration loaded through Figment: built-in defaults, an
//! optional TOML file, then `OPSCACHE__`-prefixed environment variables.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{
    AppConfig, CacheConfig, DistributedTierConfig, LocalTierConfig, LoggingConfig, PolicyConfig,
};
