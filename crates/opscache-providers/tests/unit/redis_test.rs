//! Redis provider tests
//!
//! Skipped unless `OPSCACHE_TEST_REDIS_URL` is set. Keys are written under a
//! per-test prefix, so a shared database is safe.

use futures::TryStreamExt;
use opscache_domain::value_objects::Expiration;
use opscache_providers::DistributedCacheProvider;
use opscache_providers::cache::RedisCacheProvider;
use std::time::Duration;

fn provider(prefix: &str) -> Option<RedisCacheProvider> {
    let url = std::env::var("OPSCACHE_TEST_REDIS_URL").ok()?;
    Some(
        RedisCacheProvider::new(&url)
            .unwrap()
            .with_key_prefix(format!("opscache-test-{prefix}")),
    )
}

#[tokio::test]
async fn test_redis_round_trip_and_expiry() {
    let Some(provider) = provider("round-trip") else {
        return;
    };
    provider.clear().await.unwrap();

    provider
        .set("user:42", b"payload", Expiration::from_secs(60))
        .await
        .unwrap();
    provider
        .set("short", b"v", Expiration::after(Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(
        provider.get("user:42").await.unwrap(),
        Some(b"payload".to_vec())
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(provider.get("short").await.unwrap(), None);

    assert!(provider.delete("user:42").await.unwrap());
    assert_eq!(provider.size().await.unwrap(), 0);
    provider.close().await.unwrap();
}

#[tokio::test]
async fn test_redis_scan_strips_prefix() {
    let Some(provider) = provider("scan") else {
        return;
    };
    provider.clear().await.unwrap();

    for key in ["dashboard:1", "dashboard:2", "rbac:1"] {
        provider.set(key, b"v", Expiration::from_secs(60)).await.unwrap();
    }

    let mut keys: Vec<String> = provider.scan("dashboard:*").try_collect().await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["dashboard:1".to_string(), "dashboard:2".to_string()]);

    let removed = provider.delete_many(&keys).await.unwrap();
    assert_eq!(removed, 2);

    provider.clear().await.unwrap();
    assert_eq!(provider.size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unreachable_redis_is_backend_unavailable() {
    let provider = RedisCacheProvider::new("redis://127.0.0.1:1").unwrap();
    let err = provider.ping().await.unwrap_err();
    assert!(err.is_backend_unavailable());
}
