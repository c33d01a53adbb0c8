//! Two-tier cache
//!
//! ## Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`LocalCache`] | In-process Moka tier with LRU bound and lazy expiry |
//! | [`DistributedCache`] | Timeout-bounded wrapper over a distributed provider |
//! | [`CacheManager`] | Routes calls across tiers, owns policies and tags |
//! | [`CacheKeyCodec`] | Key construction and entry encoding |
//! | [`PolicyTable`] | Per data type TTL and tier set |
//! | [`TagIndex`] | Tag to key associations |
//! | [`CacheAdminService`] | Admin request adapter |
//! | [`memoize`] | Compute-or-cache helper |

pub mod admin;
pub mod codec;
pub mod distributed;
pub mod factory;
pub mod local;
pub mod manager;
pub mod memoize;
pub mod policy;
pub mod tags;

pub use admin::{
    CacheAdminService, InvalidationRequest, InvalidationResponse, InvalidationTarget, SetRequest,
};
pub use codec::CacheKeyCodec;
pub use distributed::DistributedCache;
pub use factory::build_cache_manager;
pub use local::LocalCache;
pub use manager::{CacheManager, CacheManagerBuilder, SetOptions};
pub use memoize::memoize;
pub use policy::{DataTypePolicy, PolicyTable};
pub use tags::{TagIndex, TagLifetime};
