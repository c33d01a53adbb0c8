//! Ports (traits) implemented by the provider layer

pub mod providers;
pub mod registry;

pub use providers::{DistributedCacheProvider, KeyStream};
