//! memoize helper tests

use super::two_tier_manager;
use opscache_domain::value_objects::DataType;
use opscache_infrastructure::cache::{CacheManager, SetOptions, memoize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct LoadError;

async fn project_stats(
    manager: &CacheManager,
    calls: &AtomicUsize,
    project: u32,
) -> Result<Vec<u32>, LoadError> {
    memoize(
        manager,
        "project_stats",
        &project,
        DataType::ComputedResult,
        SetOptions::new().with_tag(format!("project:{project}")),
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![project, project * 2])
        },
    )
    .await
}

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let (manager, _store) = two_tier_manager();
    let calls = AtomicUsize::new(0);

    assert_eq!(project_stats(&manager, &calls, 3).await.unwrap(), vec![3, 6]);
    assert_eq!(project_stats(&manager, &calls, 3).await.unwrap(), vec![3, 6]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    project_stats(&manager, &calls, 4).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_tag_invalidation_forces_recompute() {
    let (manager, _store) = two_tier_manager();
    let calls = AtomicUsize::new(0);

    project_stats(&manager, &calls, 3).await.unwrap();
    assert_eq!(manager.invalidate_by_tag("project:3").await.unwrap(), 1);
    project_stats(&manager, &calls, 3).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let (manager, _store) = two_tier_manager();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let result: Result<u32, LoadError> = memoize(
            &manager,
            "flaky",
            &(),
            DataType::ApiResponse,
            SetOptions::new(),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LoadError)
            },
        )
        .await;
        assert!(result.is_err());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_outage_still_computes() {
    let (manager, store) = two_tier_manager();
    store.set_available(false);
    let calls = AtomicUsize::new(0);

    let result: Result<String, LoadError> = memoize(
        &manager,
        "session_user",
        "abc",
        DataType::SessionData,
        SetOptions::new(),
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("ada".to_string())
        },
    )
    .await;

    assert_eq!(result.unwrap(), "ada");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
