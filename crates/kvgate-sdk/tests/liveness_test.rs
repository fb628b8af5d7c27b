// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Liveness registry behaviour across workers and auditors.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CountingBackend, FailingBackend, T0_SECS, memory_sdk};
use kvgate_sdk::{LivenessRegistry, ManualClock};

#[tokio::test]
async fn test_audit_then_cleanup() {
    let (sdk, clock) = memory_sdk("auditor");
    let liveness = sdk.liveness();

    for worker in ["w1", "w2", "w3"] {
        liveness.signal(worker, "agents", None).await.unwrap();
    }
    clock.advance(Duration::from_secs(90));
    liveness.signal("w2", "agents", None).await.unwrap();
    clock.advance(Duration::from_secs(40));

    let dead = liveness
        .audit_dead("agents", Duration::from_secs(120))
        .await
        .unwrap();
    assert_eq!(dead, vec!["w1", "w3"]);

    liveness.cleanup("agents", &dead).await.unwrap();

    let stats = liveness.health_stats("agents").await.unwrap();
    assert_eq!(stats.total_workers, 1);
    assert_eq!(stats.active_workers, 1);
    assert_eq!(stats.dead_workers, 0);
    assert_eq!(stats.last_activity, Some(T0_SECS + 90));

    assert!(
        liveness
            .audit_dead("agents", Duration::from_secs(120))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_signal_is_idempotent_in_cardinality() {
    let (sdk, clock) = memory_sdk("w1");
    for _ in 0..5 {
        sdk.signal("agents").await.unwrap();
        clock.advance(Duration::from_secs(1));
    }
    let active = sdk.liveness().list_active_workers("agents", None).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].last_seen_epoch_seconds, T0_SECS + 4);
}

#[tokio::test]
async fn test_groups_are_independent() {
    let (sdk, clock) = memory_sdk("w1");
    let liveness = sdk.liveness();
    liveness.signal("w1", "agents", None).await.unwrap();
    liveness.signal("w1", "schedulers", None).await.unwrap();
    clock.advance(Duration::from_secs(600));

    liveness.cleanup("agents", &["w1".to_string()]).await.unwrap();
    assert_eq!(liveness.health_stats("agents").await.unwrap().total_workers, 0);
    assert_eq!(
        liveness
            .audit_dead("schedulers", Duration::from_secs(60))
            .await
            .unwrap(),
        vec!["w1"]
    );
}

#[tokio::test]
async fn test_stale_worker_is_found_and_removed() {
    let (sdk, clock) = memory_sdk("auditor");
    let liveness = sdk.liveness();

    liveness.signal("W1", "g", None).await.unwrap();
    clock.advance(Duration::from_secs(10));

    let dead = liveness.audit_dead("g", Duration::from_secs(5)).await.unwrap();
    assert_eq!(dead, vec!["W1"]);

    liveness.cleanup("g", &dead).await.unwrap();
    assert_eq!(liveness.health_stats("g").await.unwrap().total_workers, 0);
}

#[tokio::test]
async fn test_dead_cutoff_around_timeout() {
    let timeout = Duration::from_secs(30);

    let (sdk, clock) = memory_sdk("auditor");
    sdk.liveness().signal("w1", "g", None).await.unwrap();
    clock.set_millis((T0_SECS + 30 - 1) * 1000);
    assert!(sdk.liveness().audit_dead("g", timeout).await.unwrap().is_empty());

    clock.set_millis((T0_SECS + 30 + 1) * 1000);
    assert_eq!(sdk.liveness().audit_dead("g", timeout).await.unwrap(), vec!["w1"]);
}

#[tokio::test]
async fn test_group_named_like_ttl_hash_is_separate() {
    let (sdk, clock) = memory_sdk("auditor");
    let liveness = sdk.liveness();

    liveness.signal("w1", "g", Some(Duration::from_secs(5))).await.unwrap();
    liveness.signal("w2", "g:ttl", None).await.unwrap();
    liveness.signal("w3", "health-ttl:g", None).await.unwrap();

    assert_eq!(liveness.health_stats("g").await.unwrap().total_workers, 1);
    assert_eq!(liveness.health_stats("g:ttl").await.unwrap().total_workers, 1);

    clock.advance(Duration::from_secs(6));
    assert_eq!(liveness.audit_expired("g").await.unwrap(), vec!["w1"]);
    assert!(liveness.audit_expired("g:ttl").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cleanup_is_two_calls() {
    let backend = Arc::new(CountingBackend::default());
    let liveness = LivenessRegistry::new(backend.clone(), Arc::new(ManualClock::at_secs(T0_SECS)));

    let workers: Vec<String> = (0..20).map(|i| format!("w{}", i)).collect();
    for worker in &workers {
        liveness.signal(worker, "agents", Some(Duration::from_secs(30))).await.unwrap();
    }
    let before = backend.calls();

    liveness.cleanup("agents", &workers).await.unwrap();
    assert_eq!(backend.calls() - before, 2);
    assert_eq!(liveness.health_stats("agents").await.unwrap().total_workers, 0);
    assert!(liveness.audit_expired("agents").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cleanup_with_no_workers_makes_no_calls() {
    let backend = Arc::new(CountingBackend::default());
    let liveness = LivenessRegistry::new(backend.clone(), Arc::new(ManualClock::at_secs(T0_SECS)));

    liveness.cleanup("agents", &[]).await.unwrap();
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_unknown_group_is_empty() {
    let (sdk, _) = memory_sdk("auditor");
    let liveness = sdk.liveness();
    assert!(
        liveness
            .audit_dead("nobody", Duration::from_secs(1))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(liveness.audit_expired("nobody").await.unwrap().is_empty());
    assert!(liveness.list_active_workers("nobody", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_failure_is_not_an_empty_audit() {
    let liveness = LivenessRegistry::new(
        Arc::new(FailingBackend),
        Arc::new(ManualClock::at_secs(T0_SECS)),
    );

    assert!(
        liveness
            .audit_dead("agents", Duration::from_secs(60))
            .await
            .unwrap_err()
            .is_transport()
    );
    assert!(liveness.health_stats("agents").await.unwrap_err().is_transport());
    assert!(liveness.signal("w1", "agents", None).await.unwrap_err().is_transport());
    assert!(
        liveness
            .cleanup("agents", &["w1".to_string()])
            .await
            .unwrap_err()
            .is_transport()
    );
}
