// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background heartbeat task tests.
//!
//! These run on a paused tokio clock, so intervals elapse instantly and the
//! number of signals is deterministic.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CountingBackend, FailingBackend, T0_SECS};
use kvgate_sdk::{Clock, KvGateSdk, LivenessRegistry, ManualClock, SdkConfig};

fn registry(backend: Arc<CountingBackend>) -> LivenessRegistry {
    LivenessRegistry::new(backend, Arc::new(ManualClock::at_secs(T0_SECS)))
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_signals_immediately_and_on_interval() {
    let backend = Arc::new(CountingBackend::default());
    let liveness = registry(backend.clone());

    let handle = liveness.spawn_heartbeat("w1", "agents", Duration::from_secs(30), None);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(backend.upserts(), 1);

    let active = liveness.list_active_workers("agents", None).await.unwrap();
    assert_eq!(active[0].worker_id, "w1");

    tokio::time::sleep(Duration::from_secs(65)).await;
    assert_eq!(backend.upserts(), 3);
    assert!(handle.is_running());

    assert!(handle.stop().await);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(backend.upserts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_heartbeat() {
    let backend = Arc::new(CountingBackend::default());
    let liveness = registry(backend.clone());

    let handle = liveness.spawn_heartbeat("w1", "agents", Duration::from_secs(10), None);
    tokio::time::sleep(Duration::from_millis(1)).await;
    drop(handle);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.upserts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_survives_backend_failures() {
    let liveness = LivenessRegistry::new(
        Arc::new(FailingBackend),
        Arc::new(ManualClock::at_secs(T0_SECS)),
    );

    let handle = liveness.spawn_heartbeat("w1", "agents", Duration::from_secs(5), None);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(handle.is_running());
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_carries_ttl_hint() {
    let backend = Arc::new(CountingBackend::default());
    let clock = Arc::new(ManualClock::at_secs(T0_SECS));
    let liveness = LivenessRegistry::new(backend, clock.clone());

    let handle = liveness.spawn_heartbeat(
        "w1",
        "agents",
        Duration::from_secs(30),
        Some(Duration::from_secs(45)),
    );
    tokio::time::sleep(Duration::from_millis(1)).await;
    handle.stop().await;

    clock.advance(Duration::from_secs(46));
    assert_eq!(liveness.audit_expired("agents").await.unwrap(), vec!["w1"]);
}

#[tokio::test]
async fn test_sdk_heartbeat_respects_config() {
    let backend = Arc::new(CountingBackend::default());
    let clock = Arc::new(ManualClock::at_secs(T0_SECS));

    let disabled = KvGateSdk::with_backend(
        backend.clone(),
        clock.clone(),
        SdkConfig::new("w1").with_heartbeat_interval_ms(0),
    );
    assert!(disabled.start_heartbeat("agents").is_none());

    let enabled = KvGateSdk::with_backend(
        backend,
        clock,
        SdkConfig::new("w1").with_heartbeat_interval_ms(50),
    );
    let handle = enabled.start_heartbeat("agents").unwrap();
    assert!(handle.is_running());
    handle.stop().await;
}

/// Clock that fails the first time it is read.
#[derive(Debug)]
struct BrokenClock;

impl Clock for BrokenClock {
    fn now_millis(&self) -> i64 {
        panic!("clock unavailable");
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_reports_panicked_task() {
    let liveness = LivenessRegistry::new(Arc::new(CountingBackend::default()), Arc::new(BrokenClock));

    let handle = liveness.spawn_heartbeat("w1", "agents", Duration::from_secs(5), None);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(!handle.is_running());
    assert!(!handle.stop().await);
}
