//! Tag and pattern invalidation tests

use super::{manager_over, two_tier_manager};
use opscache_domain::ports::DistributedCacheProvider;
use opscache_domain::value_objects::{CacheEntry, CacheLevel, DataType, Expiration};
use opscache_infrastructure::cache::{CacheKeyCodec, CacheManager, SetOptions};
use opscache_providers::cache::MemoryCacheProvider;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::time::Duration;

fn short_lived(tag: &str) -> SetOptions {
    SetOptions::new()
        .with_ttl(Expiration::after(Duration::from_millis(50)))
        .with_tag(tag)
}

#[tokio::test]
async fn test_tag_invalidation_removes_tagged_user() {
    let (manager, store) = two_tier_manager();

    manager
        .set(
            "user:42",
            &json!({"name": "Ada"}),
            DataType::ComputedResult,
            SetOptions::new()
                .with_ttl(Expiration::from_secs(60))
                .with_tag("user:42"),
        )
        .await
        .unwrap();

    let read: Option<Value> = manager
        .get("user:42", &DataType::ComputedResult)
        .await
        .unwrap();
    assert_eq!(read, Some(json!({"name": "Ada"})));

    assert_eq!(manager.invalidate_by_tag("user:42").await.unwrap(), 1);

    let read: Option<Value> = manager
        .get("user:42", &DataType::ComputedResult)
        .await
        .unwrap();
    assert!(read.is_none());
    assert!(store.get("user:42").await.unwrap().is_none());
    assert!(manager.keys_for_tag("user:42").is_empty());
}

#[tokio::test]
async fn test_unknown_tag_removes_nothing() {
    let (manager, _store) = two_tier_manager();
    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();

    assert_eq!(manager.invalidate_by_tag("nobody").await.unwrap(), 0);
    let read: Option<u32> = manager.get("api:1", &DataType::ApiResponse).await.unwrap();
    assert_eq!(read, Some(1));
}

#[tokio::test]
async fn test_tag_spans_keys_and_data_types() {
    let (manager, _store) = two_tier_manager();
    let team = || SetOptions::new().with_tag("team:7");

    manager
        .set("dashboard:7", &"d", DataType::Dashboard, team())
        .await
        .unwrap();
    manager
        .set("rbac:7:read", &true, DataType::RbacDecision, team())
        .await
        .unwrap();
    manager
        .set("session:7", &"s", DataType::SessionData, team().with_tag("user:1"))
        .await
        .unwrap();

    assert_eq!(manager.keys_for_tag("team:7").len(), 3);
    assert_eq!(manager.invalidate_by_tag("team:7").await.unwrap(), 3);

    for (key, data_type) in [
        ("dashboard:7", DataType::Dashboard),
        ("rbac:7:read", DataType::RbacDecision),
        ("session:7", DataType::SessionData),
    ] {
        let read: Option<Value> = manager.get(key, &data_type).await.unwrap();
        assert!(read.is_none(), "{key}");
    }
    // The other tag of a removed key goes with it
    assert!(manager.keys_for_tag("user:1").is_empty());
}

#[tokio::test]
async fn test_retagging_replaces_previous_tags() {
    let (manager, _store) = two_tier_manager();

    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new().with_tag("old"))
        .await
        .unwrap();
    manager
        .set("api:1", &2, DataType::ApiResponse, SetOptions::new().with_tag("new"))
        .await
        .unwrap();

    assert_eq!(manager.invalidate_by_tag("old").await.unwrap(), 0);
    assert_eq!(
        manager.tags_of("api:1"),
        BTreeSet::from(["new".to_string()])
    );
}

#[tokio::test]
async fn test_delete_prunes_tags() {
    let (manager, _store) = two_tier_manager();
    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new().with_tag("t"))
        .await
        .unwrap();

    assert!(manager.delete("api:1").await.unwrap());
    assert!(!manager.delete("api:1").await.unwrap());
    assert!(manager.tags_of("api:1").is_empty());
    assert_eq!(manager.invalidate_by_tag("t").await.unwrap(), 0);
}

#[tokio::test]
async fn test_tag_invalidation_with_store_down_still_clears_local() {
    let (manager, store) = two_tier_manager();
    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new().with_tag("t"))
        .await
        .unwrap();

    store.set_available(false);
    assert_eq!(manager.invalidate_by_tag("t").await.unwrap(), 1);
    assert!(manager.local().get("api:1").is_none());
}

#[tokio::test]
async fn test_repopulated_entry_keeps_its_tags() {
    let (manager, store) = two_tier_manager();
    let entry = CacheEntry::new(
        json!("panel"),
        DataType::Dashboard,
        Expiration::from_secs(60),
        BTreeSet::from(["team:3".to_string()]),
    );
    store
        .set(
            "dashboard:3",
            &CacheKeyCodec::encode(&entry).unwrap(),
            Expiration::from_secs(60),
        )
        .await
        .unwrap();

    let _: Option<Value> = manager
        .get("dashboard:3", &DataType::Dashboard)
        .await
        .unwrap();

    assert_eq!(manager.keys_for_tag("team:3"), vec!["dashboard:3".to_string()]);
    assert_eq!(manager.invalidate_by_tag("team:3").await.unwrap(), 1);
    assert!(store.get("dashboard:3").await.unwrap().is_none());
}

#[tokio::test]
async fn test_swept_local_entries_leave_the_tag_index() {
    let manager = CacheManager::builder().build().unwrap();
    for i in 0..100 {
        manager
            .set(
                &format!("rbac:decision:{i}"),
                &true,
                DataType::RbacDecision,
                short_lived("user:42").with_levels([CacheLevel::Local]),
            )
            .await
            .unwrap();
    }
    assert_eq!(manager.get_stats().await.unwrap().tags, 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(manager.local().purge_expired(), 100);

    assert_eq!(manager.get_stats().await.unwrap().tags, 0);
    assert!(manager.tags_of("rbac:decision:0").is_empty());
    assert_eq!(manager.invalidate_by_tag("user:42").await.unwrap(), 0);
}

#[tokio::test]
async fn test_lru_evicted_local_entries_leave_the_tag_index() {
    let manager = CacheManager::builder().local_capacity(2).build().unwrap();
    for key in ["session:1", "session:2", "session:3"] {
        manager
            .set(
                key,
                &key,
                DataType::SessionData,
                SetOptions::new()
                    .with_levels([CacheLevel::Local])
                    .with_tag("user:7"),
            )
            .await
            .unwrap();
    }

    assert_eq!(manager.keys_for_tag("user:7"), vec!["session:2", "session:3"]);
    assert_eq!(manager.invalidate_by_tag("user:7").await.unwrap(), 2);
}

#[tokio::test]
async fn test_expired_shared_entries_leave_the_tag_index() {
    let (manager, _store) = two_tier_manager();
    manager
        .set(
            "dashboard:9",
            &"panel",
            DataType::Dashboard,
            short_lived("team:9").with_levels([CacheLevel::Local, CacheLevel::Distributed]),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert!(manager.keys_for_tag("team:9").is_empty());
    assert_eq!(manager.get_stats().await.unwrap().tags, 0);
    assert_eq!(manager.invalidate_by_tag("team:9").await.unwrap(), 0);
}

#[tokio::test]
async fn test_tag_invalidation_counts_only_removed_keys() {
    let (manager, store) = two_tier_manager();
    let both = [CacheLevel::Local, CacheLevel::Distributed];
    for key in ["api:1", "api:2"] {
        manager
            .set(
                key,
                &1,
                DataType::ApiResponse,
                SetOptions::new().with_levels(both).with_tag("t"),
            )
            .await
            .unwrap();
    }
    // api:2 vanished from both tiers behind the manager's back
    store.delete("api:2").await.unwrap();
    manager.local().discard("api:2");

    assert_eq!(manager.invalidate_by_tag("t").await.unwrap(), 1);
    assert!(manager.keys_for_tag("t").is_empty());
}

#[tokio::test]
async fn test_pattern_invalidation_covers_both_tiers() {
    let store = MemoryCacheProvider::new();
    let manager = manager_over(&store, 100);
    let other_process = manager_over(&store, 100);

    manager
        .set("dashboard:1", &1, DataType::Dashboard, SetOptions::new())
        .await
        .unwrap();
    manager
        .set(
            "dashboard:2",
            &2,
            DataType::Dashboard,
            SetOptions::new().with_levels([CacheLevel::Local]),
        )
        .await
        .unwrap();
    other_process
        .set("dashboard:3", &3, DataType::Dashboard, SetOptions::new())
        .await
        .unwrap();
    manager
        .set("rbac:1", &true, DataType::RbacDecision, SetOptions::new())
        .await
        .unwrap();

    assert_eq!(manager.invalidate_pattern("dashboard:*").await.unwrap(), 3);

    for key in ["dashboard:1", "dashboard:2", "dashboard:3"] {
        let read: Option<u32> = manager.get(key, &DataType::Dashboard).await.unwrap();
        assert!(read.is_none(), "{key}");
        assert!(store.get(key).await.unwrap().is_none(), "{key}");
    }
    let read: Option<bool> = manager.get("rbac:1", &DataType::RbacDecision).await.unwrap();
    assert_eq!(read, Some(true));
}

#[tokio::test]
async fn test_pattern_braces_match_literally_on_both_tiers() {
    let (manager, store) = two_tier_manager();
    for key in ["cfg:a", "cfg:b", "cfg:{a,b}"] {
        manager
            .set(
                key,
                &1,
                DataType::ApiResponse,
                SetOptions::new().with_levels([CacheLevel::Local, CacheLevel::Distributed]),
            )
            .await
            .unwrap();
    }

    assert_eq!(manager.invalidate_pattern("cfg:{a,b}").await.unwrap(), 1);

    assert!(store.get("cfg:{a,b}").await.unwrap().is_none());
    for key in ["cfg:a", "cfg:b"] {
        assert!(manager.local().get(key).is_some(), "{key}");
        assert!(store.get(key).await.unwrap().is_some(), "{key}");
    }
}

#[tokio::test]
async fn test_pattern_without_matches_returns_zero() {
    let (manager, _store) = two_tier_manager();
    assert_eq!(manager.invalidate_pattern("nothing:*").await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_pattern_is_rejected() {
    let (manager, _store) = two_tier_manager();
    assert!(manager.invalidate_pattern("").await.is_err());
    assert!(manager.invalidate_pattern("user:[").await.is_err());
}

#[tokio::test]
async fn test_pattern_invalidation_with_store_down_clears_local() {
    let (manager, store) = two_tier_manager();
    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new())
        .await
        .unwrap();

    store.set_available(false);
    assert_eq!(manager.invalidate_pattern("api:*").await.unwrap(), 1);
    assert!(manager.local().get("api:1").is_none());
}

#[tokio::test]
async fn test_clear_all_empties_everything() {
    let (manager, store) = two_tier_manager();
    manager
        .set("api:1", &1, DataType::ApiResponse, SetOptions::new().with_tag("t"))
        .await
        .unwrap();

    manager.clear_all().await.unwrap();

    assert_eq!(manager.local().len(), 0);
    assert_eq!(store.size().await.unwrap(), 0);
    assert!(manager.keys_for_tag("t").is_empty());
}
