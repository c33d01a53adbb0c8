//! Redis distributed cache provider
//!
//! Distributed cache implementation using Redis as the backend.
//! Suitable for multi-instance deployments.
//!
//! ## Features
//!
//! - Native TTL (`SET ... PX`) with millisecond precision
//! - Cursor-based `SCAN` for pattern invalidation (never `KEYS`)
//! - Lazily established, auto-reconnecting connection
//! - Optional key prefix isolating this cache inside a shared database
//!
//! ## Example
//!
//! ```ignore
//! use opscache_providers::cache::RedisCacheProvider;
//!
//! let provider = RedisCacheProvider::new("redis://localhost:6379")?
//!     .with_key_prefix("ops");
//! ```

use crate::constants::{
    REDIS_DEFAULT_URI, REDIS_DELETE_BATCH_SIZE, REDIS_PROVIDER_NAME, REDIS_SCAN_COUNT,
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use opscache_domain::error::{Error, Result};
use opscache_domain::ports::providers::cache::{DistributedCacheProvider, KeyStream};
use opscache_domain::value_objects::Expiration;
use redis::Client;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Redis cache provider
///
/// The connection is opened on first use so an unreachable server at startup
/// degrades the tier instead of failing construction.
#[derive(Clone)]
pub struct RedisCacheProvider {
    client: Client,
    connection: Arc<RwLock<Option<ConnectionManager>>>,
    key_prefix: Option<String>,
    scan_count: usize,
}

impl RedisCacheProvider {
    /// Create a new Redis cache provider with connection string
    ///
    /// # Arguments
    ///
    /// * `connection_string` - Redis connection URL (e.g., "redis://localhost:6379")
    pub fn new(connection_string: &str) -> Result<Self> {
        let client = Client::open(connection_string).map_err(|e| {
            Error::configuration_with_source(format!("Failed to create Redis client: {e}"), e)
        })?;

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: None,
            scan_count: REDIS_SCAN_COUNT,
        })
    }

    /// Create a new Redis cache provider with host and port
    pub fn with_host_port(host: &str, port: u16) -> Result<Self> {
        Self::new(&format!("redis://{host}:{port}"))
    }

    /// Namespace every key under `prefix:`
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        self.key_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Number of keys requested per SCAN round trip
    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }

    /// Configured key prefix
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    /// Get the shared connection, connecting on first use
    async fn connection(&self) -> Result<ConnectionManager> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| unavailable("connect", e))?;
        *slot = Some(conn.clone());
        tracing::info!("Redis cache connection established");
        Ok(conn)
    }

    fn storage_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    fn logical_key(&self, stored: String) -> String {
        match &self.key_prefix {
            Some(prefix) => stored
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .map(str::to_string)
                .unwrap_or(stored),
            None => stored,
        }
    }

    /// Cursor-based SCAN over the (prefixed) keyspace
    fn scan_keys(self, pattern: String) -> impl Stream<Item = Result<String>> + Send + 'static {
        async_stream::try_stream! {
            let mut conn = self.connection().await?;
            let pattern = self.storage_key(&pattern);
            let mut cursor: u64 = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(self.scan_count)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| redis_error("SCAN", e))?;

                for key in keys {
                    yield self.logical_key(key);
                }

                if next == 0 {
                    break;
                }
                cursor = next;
            }
        }
    }
}

/// Map a Redis failure to a domain error
///
/// Transport failures make the tier unavailable. Server replies such as
/// `WRONGTYPE` or a rejected argument are internal errors: the store is up.
fn redis_error(operation: &str, err: redis::RedisError) -> Error {
    let transport = err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout();
    if transport {
        unavailable(operation, err)
    } else {
        Error::internal(format!("Redis {operation} rejected: {err}"))
    }
}

/// The store cannot be reached, whatever the reason
fn unavailable(operation: &str, err: redis::RedisError) -> Error {
    Error::backend_unavailable_with_source(
        REDIS_PROVIDER_NAME,
        format!("Redis {operation} failed: {err}"),
        err,
    )
}

#[async_trait]
impl DistributedCacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(self.storage_key(key))
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(|e| redis_error("GET", e))
    }

    async fn set(&self, key: &str, payload: &[u8], expiration: Expiration) -> Result<()> {
        let mut conn = self.connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(self.storage_key(key)).arg(payload);
        if let Some(ttl) = expiration.as_duration() {
            // Sub-millisecond TTLs round up so they never mean "no expiry"
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            cmd.arg("PX").arg(millis);
        }

        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(|e| redis_error("SET", e))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted: i64 = redis::cmd("DEL")
            .arg(self.storage_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("DEL", e))?;
        Ok(deleted > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection().await?;
        let stored: Vec<String> = keys.iter().map(|key| self.storage_key(key)).collect();
        let deleted: u64 = redis::cmd("DEL")
            .arg(&stored)
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("DEL", e))?;
        Ok(deleted)
    }

    fn scan(&self, pattern: &str) -> KeyStream {
        self.clone().scan_keys(pattern.to_string()).boxed()
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| redis_error("PING", e))
    }

    async fn size(&self) -> Result<u64> {
        if self.key_prefix.is_some() {
            let mut keys = self.scan("*");
            let mut count = 0u64;
            while let Some(key) = keys.next().await {
                key?;
                count += 1;
            }
            return Ok(count);
        }

        let mut conn = self.connection().await?;
        redis::cmd("DBSIZE")
            .query_async::<u64>(&mut conn)
            .await
            .map_err(|e| redis_error("DBSIZE", e))
    }

    async fn clear(&self) -> Result<()> {
        if self.key_prefix.is_none() {
            let mut conn = self.connection().await?;
            return redis::cmd("FLUSHDB")
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| redis_error("FLUSHDB", e));
        }

        // Only this cache's keys: the database may be shared
        let mut keys = self.scan("*");
        let mut batch = Vec::with_capacity(REDIS_DELETE_BATCH_SIZE);
        while let Some(key) = keys.next().await {
            batch.push(key?);
            if batch.len() >= REDIS_DELETE_BATCH_SIZE {
                self.delete_many(&batch).await?;
                batch.clear();
            }
        }
        self.delete_many(&batch).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.connection.write().await.take().is_some() {
            tracing::info!("Redis cache connection closed");
        }
        Ok(())
    }

    fn provider_name(&self) -> &str {
        REDIS_PROVIDER_NAME
    }
}

impl std::fmt::Debug for RedisCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheProvider")
            .field("key_prefix", &self.key_prefix)
            .field("scan_count", &self.scan_count)
            .finish()
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use opscache_domain::ports::registry::{
    DISTRIBUTED_CACHE_PROVIDERS, DistributedProviderConfig, DistributedProviderEntry,
};

/// Factory function for creating Redis cache provider instances.
fn redis_cache_factory(
    config: &DistributedProviderConfig,
) -> Result<Arc<dyn DistributedCacheProvider>> {
    let uri = config.uri.as_deref().unwrap_or(REDIS_DEFAULT_URI);

    let mut provider = RedisCacheProvider::new(uri)?;
    if let Some(prefix) = &config.key_prefix {
        provider = provider.with_key_prefix(prefix.clone());
    }
    if let Some(count) = config
        .extra
        .get("scan_count")
        .and_then(|count| count.parse().ok())
    {
        provider = provider.with_scan_count(count);
    }

    Ok(Arc::new(provider))
}

#[linkme::distributed_slice(DISTRIBUTED_CACHE_PROVIDERS)]
static REDIS_PROVIDER: DistributedProviderEntry = DistributedProviderEntry {
    name: "redis",
    description: "Redis distributed cache",
    factory: redis_cache_factory,
};
