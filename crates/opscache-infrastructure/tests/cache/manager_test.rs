//! CacheManager read, write and health tests

use super::{manager_over, two_tier_manager};
use chrono::{TimeDelta, Utc};
use opscache_domain::Error;
use opscache_domain::ports::DistributedCacheProvider;
use opscache_domain::value_objects::{CacheEntry, CacheLevel, DataType, Expiration};
use opscache_infrastructure::cache::{CacheKeyCodec, CacheManager, SetOptions};
use opscache_infrastructure::health::HealthStatus;
use opscache_providers::cache::MemoryCacheProvider;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::time::Duration;

#[tokio::test]
async fn test_read_after_write_for_every_builtin_type() {
    let (manager, _store) = two_tier_manager();
    let data_types = [
        DataType::ApiResponse,
        DataType::ComputedResult,
        DataType::SessionData,
        DataType::Dashboard,
        DataType::RbacDecision,
        DataType::PrometheusQuery,
        DataType::Custom("webhook_delivery".to_string()),
    ];

    for (i, data_type) in data_types.iter().enumerate() {
        let key = format!("rw:{data_type}");
        assert!(
            manager
                .set(&key, &json!({"n": i}), data_type.clone(), SetOptions::new())
                .await
                .unwrap()
        );
        let read: Option<Value> = manager.get(&key, data_type).await.unwrap();
        assert_eq!(read, Some(json!({"n": i})), "{data_type}");
    }
}

#[tokio::test]
async fn test_unknown_key_is_a_miss() {
    let (manager, _store) = two_tier_manager();
    let read: Option<Value> = manager
        .get("never:written", &DataType::ApiResponse)
        .await
        .unwrap();
    assert!(read.is_none());
}

#[tokio::test]
async fn test_writes_follow_the_policy_tiers() {
    let (manager, store) = two_tier_manager();

    manager
        .set("session:1", &"s", DataType::SessionData, SetOptions::new())
        .await
        .unwrap();
    manager
        .set("rbac:1", &true, DataType::RbacDecision, SetOptions::new())
        .await
        .unwrap();

    // session_data lives only in the shared tier, rbac_decision only locally
    assert!(manager.local().get("session:1").is_none());
    assert!(store.get("session:1").await.unwrap().is_some());
    assert!(manager.local().get("rbac:1").is_some());
    assert!(store.get("rbac:1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_explicit_ttl_overrides_policy() {
    let (manager, _store) = two_tier_manager();

    manager
        .set(
            "api:1",
            &1,
            DataType::ApiResponse,
            SetOptions::new().with_ttl(Expiration::Never),
        )
        .await
        .unwrap();

    let entry = manager.local().get("api:1").unwrap();
    assert!(entry.expires_at.is_none());

    manager
        .set("api:2", &2, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();
    let entry = manager.local().get("api:2").unwrap();
    let ttl = entry.expires_at.unwrap() - entry.created_at;
    assert_eq!(ttl, TimeDelta::seconds(300));
}

#[tokio::test]
async fn test_distributed_hit_repopulates_local_with_remaining_ttl() {
    let (manager, _store) = two_tier_manager();
    let distributed = manager.distributed().unwrap();

    let original = CacheEntry::created_at(
        json!("panel"),
        DataType::Dashboard,
        Expiration::from_secs(60),
        BTreeSet::new(),
        Utc::now() - TimeDelta::seconds(50),
    );
    distributed.set("dashboard:9", &original).await.unwrap();

    let read: Option<Value> = manager
        .get("dashboard:9", &DataType::Dashboard)
        .await
        .unwrap();
    assert_eq!(read, Some(json!("panel")));

    let repopulated = manager.local().get("dashboard:9").unwrap();
    assert_eq!(repopulated.expires_at, original.expires_at);

    let stats = manager.get_stats().await.unwrap();
    assert_eq!(stats.repopulations, 1);
}

#[tokio::test]
async fn test_expired_distributed_entry_is_a_miss_and_not_repopulated() {
    let (manager, store) = two_tier_manager();

    let expired = CacheEntry::created_at(
        json!("old"),
        DataType::Dashboard,
        Expiration::from_secs(10),
        BTreeSet::new(),
        Utc::now() - TimeDelta::seconds(30),
    );
    // Stored without native TTL, as if the store's clock lagged behind
    store
        .set(
            "dashboard:old",
            &CacheKeyCodec::encode(&expired).unwrap(),
            Expiration::Never,
        )
        .await
        .unwrap();

    let read: Option<Value> = manager
        .get("dashboard:old", &DataType::Dashboard)
        .await
        .unwrap();
    assert!(read.is_none());
    assert!(manager.local().get("dashboard:old").is_none());
}

#[tokio::test]
async fn test_unreachable_distributed_tier_degrades_to_local() {
    let (manager, store) = two_tier_manager();
    store.set_available(false);

    let stored = manager
        .set(
            "user:7",
            &json!({"name": "Grace"}),
            DataType::ComputedResult,
            SetOptions::new().with_levels([CacheLevel::Local, CacheLevel::Distributed]),
        )
        .await
        .unwrap();
    assert!(stored);

    let read: Option<Value> = manager
        .get("user:7", &DataType::ComputedResult)
        .await
        .unwrap();
    assert_eq!(read, Some(json!({"name": "Grace"})));

    let health = manager.health_check().await;
    assert_eq!(health.status, HealthStatus::Degraded);
    let distributed = health.tier(CacheLevel::Distributed).unwrap();
    assert!(!distributed.reachable);
    assert!(distributed.error.is_some());
    assert!(health.tier(CacheLevel::Local).unwrap().reachable);
}

#[tokio::test]
async fn test_distributed_only_calls_fail_when_tier_is_down() {
    let (manager, store) = two_tier_manager();
    store.set_available(false);

    let write = manager
        .set("session:9", &"s", DataType::SessionData, SetOptions::new())
        .await;
    assert!(matches!(write, Err(Error::BackendUnavailable { .. })));

    let read = manager
        .get::<String>("session:9", &DataType::SessionData)
        .await;
    assert!(matches!(read, Err(Error::BackendUnavailable { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_slow_distributed_tier_is_bounded_by_timeout() {
    let (manager, store) = two_tier_manager();
    store.set_latency(Duration::from_secs(10));

    let stored = manager
        .set("api:slow", &1, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();
    assert!(stored);

    let health = manager.health_check().await;
    assert_eq!(health.status, HealthStatus::Degraded);
}

#[tokio::test]
async fn test_healthy_tiers_report_up() {
    let (manager, _store) = two_tier_manager();
    let health = manager.health_check().await;

    assert_eq!(health.status, HealthStatus::Up);
    assert_eq!(health.tiers.len(), 2);
    assert_eq!(health.tier(CacheLevel::Distributed).unwrap().backend, "memory");
}

#[tokio::test]
async fn test_local_lru_scenario() {
    let manager = CacheManager::builder().local_capacity(2).build().unwrap();
    let local_only = || SetOptions::new().with_levels([CacheLevel::Local]);

    manager
        .set("a", &"A", DataType::ComputedResult, local_only())
        .await
        .unwrap();
    manager
        .set("b", &"B", DataType::ComputedResult, local_only())
        .await
        .unwrap();
    let a: Option<String> = manager.get("a", &DataType::ComputedResult).await.unwrap();
    assert_eq!(a.as_deref(), Some("A"));
    manager
        .set("c", &"C", DataType::ComputedResult, local_only())
        .await
        .unwrap();

    let get = |key: &'static str| {
        let manager = &manager;
        async move {
            manager
                .get::<String>(key, &DataType::ComputedResult)
                .await
                .unwrap()
        }
    };
    assert_eq!(get("a").await.as_deref(), Some("A"));
    assert_eq!(get("b").await, None);
    assert_eq!(get("c").await.as_deref(), Some("C"));
    assert_eq!(manager.get_stats().await.unwrap().evictions, 1);
}

#[tokio::test]
async fn test_stats_rates_match_counters() {
    let (manager, _store) = two_tier_manager();
    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();

    for _ in 0..3 {
        let _: Option<u32> = manager.get("api:1", &DataType::ApiResponse).await.unwrap();
    }
    let _: Option<u32> = manager.get("api:404", &DataType::ApiResponse).await.unwrap();

    let stats = manager.get_stats().await.unwrap();
    assert_eq!((stats.hits, stats.misses, stats.total_requests), (3, 1, 4));
    assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
    assert!((stats.hit_rate + stats.miss_rate - 1.0).abs() < 1e-9);
    assert_eq!(stats.local_size, 1);
    assert_eq!(stats.distributed_size, Some(1));
    assert_eq!(stats.tiers.len(), 2);

    manager.reset_stats();
    let stats = manager.get_stats().await.unwrap();
    assert_eq!(stats.total_requests, 0);
    assert!((stats.hit_rate - 0.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_reading_stats_with_store_down_leaves_stats_unchanged() {
    let (manager, store) = two_tier_manager();
    store.set_available(false);

    for _ in 0..2 {
        let stats = manager.get_stats().await.unwrap();
        assert_eq!(stats.distributed_size, None);
        let distributed = stats
            .tiers
            .iter()
            .find(|tier| tier.level == CacheLevel::Distributed)
            .unwrap();
        assert_eq!(distributed.errors, 0);
        assert_eq!(distributed.entries, None);
    }
}

#[tokio::test]
async fn test_managers_sharing_a_store_see_each_other() {
    let store = MemoryCacheProvider::new();
    let writer = manager_over(&store, 10);
    let reader = manager_over(&store, 10);

    writer
        .set("pipeline:3", &"green", DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();

    let read: Option<String> = reader
        .get("pipeline:3", &DataType::ApiResponse)
        .await
        .unwrap();
    assert_eq!(read.as_deref(), Some("green"));
    assert!(reader.local().get("pipeline:3").is_some());
}

#[tokio::test]
async fn test_invalid_key_and_bad_payload_are_surfaced() {
    let (manager, _store) = two_tier_manager();

    let bad_key = manager
        .set("has space", &1, DataType::ApiResponse, SetOptions::new())
        .await;
    assert!(matches!(bad_key, Err(Error::InvalidKey { .. })));

    manager
        .set("api:text", &"text", DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();
    let wrong_type = manager.get::<u64>("api:text", &DataType::ApiResponse).await;
    assert!(matches!(wrong_type, Err(Error::Serialization { .. })));
}

#[tokio::test]
async fn test_disabled_manager_skips_everything() {
    let manager = CacheManager::builder().enabled(false).build().unwrap();

    let stored = manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();
    assert!(!stored);
    let read: Option<u32> = manager.get("api:1", &DataType::ApiResponse).await.unwrap();
    assert!(read.is_none());
}

#[tokio::test]
async fn test_empty_tier_set_writes_nothing() {
    // No distributed tier, and session_data only uses the distributed tier
    let manager = CacheManager::builder().build().unwrap();

    let stored = manager
        .set("session:1", &"s", DataType::SessionData, SetOptions::new())
        .await
        .unwrap();
    assert!(!stored);
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let (manager, store) = two_tier_manager();
    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();

    manager.shutdown().await.unwrap();
    manager.shutdown().await.unwrap();

    let read: Option<u32> = manager.get("api:1", &DataType::ApiResponse).await.unwrap();
    assert!(read.is_none());
    let stored = manager
        .set("api:2", &2, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();
    assert!(!stored);
    assert_eq!(manager.health_check().await.status, HealthStatus::Down);

    // Shared entries outlive this process's manager
    assert!(store.get("api:1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweeper_purges_expired_entries() {
    let manager = CacheManager::builder()
        .sweep_interval(Duration::from_millis(20))
        .build()
        .unwrap();

    manager
        .set(
            "api:short",
            &1,
            DataType::ApiResponse,
            SetOptions::new().with_ttl(Expiration::after(Duration::from_millis(10))),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(manager.local().len(), 0);
    assert_eq!(manager.get_stats().await.unwrap().evictions, 1);
    manager.shutdown().await.unwrap();
}
