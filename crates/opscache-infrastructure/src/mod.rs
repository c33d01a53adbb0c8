//! # Infrastructure Layer
//!
//! The two-tier cache and the technical concerns around it.
//!
//! ### Data & Storage
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Local and distributed tiers, manager, codec, policies, tags |
//!
//! ### Configuration
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment-based TOML and environment configuration |
//! | [`constants`] | Centralized configuration constants |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`health`] | Tier health reports |
//! | [`logging`] | Structured logging with tracing |

pub mod cache;
pub mod config;
pub mod constants;
pub mod error_ext;
pub mod health;
pub mod logging;

// Re-export commonly used types
pub use cache::{CacheManager, SetOptions, build_cache_manager};
pub use error_ext::ErrorContext;
