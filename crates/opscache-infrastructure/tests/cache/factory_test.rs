//! build_cache_manager tests

use opscache_domain::Error;
use opscache_domain::value_objects::{CacheLevel, DataType};
use opscache_infrastructure::cache::{SetOptions, build_cache_manager};
use opscache_infrastructure::config::{CacheConfig, DistributedTierConfig};
use opscache_infrastructure::health::HealthStatus;

fn memory_tier() -> DistributedTierConfig {
    DistributedTierConfig {
        provider: "memory".to_string(),
        ..DistributedTierConfig::default()
    }
}

#[tokio::test]
async fn test_default_config_is_local_only() {
    let manager = build_cache_manager(&CacheConfig::default()).unwrap();

    assert!(manager.is_active());
    assert!(manager.distributed().is_none());
    let health = manager.health_check().await;
    assert_eq!(health.tiers.len(), 1);
    assert_eq!(health.status, HealthStatus::Up);
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_named_provider_is_resolved() {
    let config = CacheConfig::default().with_distributed(memory_tier());
    let manager = build_cache_manager(&config).unwrap();

    assert_eq!(manager.distributed().unwrap().backend(), "memory");
    assert!(
        manager
            .set("session:1", &"s", DataType::SessionData, SetOptions::new())
            .await
            .unwrap()
    );
    assert!(manager.health_check().await.tier(CacheLevel::Distributed).unwrap().reachable);
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_provider_fails() {
    let config = CacheConfig::default().with_distributed(DistributedTierConfig {
        provider: "memcached".to_string(),
        ..DistributedTierConfig::default()
    });

    let result = build_cache_manager(&config);
    assert!(matches!(result, Err(Error::Configuration { .. })));
}

#[tokio::test]
async fn test_disabled_config_builds_inactive_manager() {
    let config = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let manager = build_cache_manager(&config).unwrap();
    assert!(!manager.is_active());
}

#[tokio::test]
async fn test_policy_overrides_are_applied() {
    let mut config = CacheConfig::default().with_distributed(memory_tier());
    config.policies.remove(&DataType::SessionData);
    let manager = build_cache_manager(&config).unwrap();

    // Falls back to the default policy, which includes the local tier
    assert!(
        manager
            .policy(&DataType::SessionData)
            .levels
            .contains(&CacheLevel::Local)
    );
}
