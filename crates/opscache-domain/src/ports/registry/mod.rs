//! Provider registries

pub mod cache;

pub use cache::{
    DISTRIBUTED_CACHE_PROVIDERS, DistributedProviderConfig, DistributedProviderEntry,
    list_distributed_providers, resolve_distributed_provider,
};
