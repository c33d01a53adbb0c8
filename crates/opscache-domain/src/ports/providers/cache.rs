//! Distributed Cache Provider Port
//!
//! Port for the shared cache tier. Implementations speak to a store that is
//! reachable over the network and survives process restarts (Redis), or to
//! an in-process stand-in with the same semantics for single-node setups.
//!
//! Providers work on opaque byte payloads; encoding is the caller's job so a
//! key written through one tier is resolvable from the other.

use crate::error::Result;
use crate::value_objects::Expiration;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, finite stream of keys produced by a cursor-based scan
pub type KeyStream = BoxStream<'static, Result<String>>;

/// Distributed Cache Provider Port
///
/// Transport failures must surface as
/// [`Error::BackendUnavailable`](crate::error::Error::BackendUnavailable),
/// never as a miss.
///
/// # Example
///
/// ```ignore
/// use opscache_domain::ports::providers::DistributedCacheProvider;
/// use opscache_domain::value_objects::Expiration;
///
/// provider.set("ops:dashboard:1", b"{}", Expiration::from_secs(60)).await?;
/// if let Some(bytes) = provider.get("ops:dashboard:1").await? {
///     // decode bytes
/// }
/// ```
#[async_trait]
pub trait DistributedCacheProvider: Send + Sync + std::fmt::Debug {
    /// Get the raw payload stored under `key`
    ///
    /// # Returns
    /// `Ok(None)` when the key does not exist or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a payload with native TTL
    ///
    /// `Expiration::Never` stores without expiry.
    async fn set(&self, key: &str, payload: &[u8], expiration: Expiration) -> Result<()>;

    /// Delete a key
    ///
    /// # Returns
    /// True if the key existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete several keys in one round trip
    ///
    /// # Returns
    /// Number of keys that existed
    async fn delete_many(&self, keys: &[String]) -> Result<u64>;

    /// Stream the keys matching a glob pattern
    ///
    /// Iteration is cursor-based and never blocks the store for the whole
    /// keyspace.
    fn scan(&self, pattern: &str) -> KeyStream;

    /// Lightweight round trip used by health checks
    async fn ping(&self) -> Result<()>;

    /// Number of keys held by the store
    async fn size(&self) -> Result<u64>;

    /// Remove every key owned by this provider
    ///
    /// Destructive on a shared store: only operator paths call this.
    async fn clear(&self) -> Result<()>;

    /// Release connections held by the provider
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Get the name/identifier of this provider implementation
    ///
    /// # Returns
    /// A string identifier for the provider (e.g., "redis", "memory")
    fn provider_name(&self) -> &str;
}
