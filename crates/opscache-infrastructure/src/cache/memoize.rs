//! Memoization helper
//!
//! Caller-side convenience on top of [`CacheManager`]: derive a key from a
//! name and arguments, serve a cached value when present, otherwise compute
//! and store it. Cache failures are logged and never fail the computation.

use crate::cache::manager::{CacheManager, SetOptions};
use opscache_domain::value_objects::DataType;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::warn;

/// Return the cached result of `compute` for `(name, args)`, computing it on a miss
///
/// # Example
///
/// ```ignore
/// let stats: ProjectStats = memoize(
///     &manager,
///     "project_stats",
///     &project_id,
///     DataType::ComputedResult,
///     SetOptions::new().with_tag(format!("project:{project_id}")),
///     || repository.load_stats(project_id),
/// )
/// .await?;
/// ```
pub async fn memoize<A, T, E, F, Fut>(
    manager: &CacheManager,
    name: &str,
    args: &A,
    data_type: DataType,
    options: SetOptions,
    compute: F,
) -> Result<T, E>
where
    A: Serialize + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let key = match manager.key(name, args) {
        Ok(key) => key,
        Err(err) => {
            warn!(name, error = %err, "memoize: cannot build cache key, computing directly");
            return compute().await;
        }
    };

    match manager.get::<T>(&key, &data_type).await {
        Ok(Some(cached)) => return Ok(cached),
        Ok(None) => {}
        Err(err) => warn!(key, error = %err, "memoize: cache read failed"),
    }

    let value = compute().await?;

    if let Err(err) = manager.set(&key, &value, data_type, options).await {
        warn!(key, error = %err, "memoize: cache write failed");
    }

    Ok(value)
}
