// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Session lock behaviour across workers.

mod common;

use std::sync::Arc;

use common::{CountingBackend, FailingBackend, T0_SECS, memory_sdk};
use futures::future::join_all;
use kvgate_sdk::{KvGateSdk, ManualClock, MemoryBackend, SdkConfig, SdkError, SessionLock};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquire_has_one_winner() {
    let lock = SessionLock::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(ManualClock::at_secs(T0_SECS)),
    );

    let attempts = (0..64).map(|i| {
        let lock = lock.clone();
        tokio::spawn(async move { lock.try_acquire("5511999", &format!("worker-{}", i)).await })
    });
    let results: Vec<bool> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|won| **won).count(), 1);

    let winner = results.iter().position(|won| *won).unwrap();
    let holder = lock.holder("5511999").await.unwrap().unwrap();
    assert_eq!(holder.owner_id, format!("worker-{}", winner));
}

#[tokio::test]
async fn test_acquire_release_cycle() {
    let (a, _) = memory_sdk("worker-a");
    let b = KvGateSdk::with_backend(
        a.backend(),
        Arc::new(ManualClock::at_secs(T0_SECS)),
        SdkConfig::new("worker-b"),
    );

    assert!(a.acquire_session("5511").await.unwrap());
    assert!(!b.acquire_session("5511").await.unwrap());

    // Non-owner release is rejected and leaves the lock in place
    assert!(!b.release_session("5511").await.unwrap());
    assert_eq!(
        a.session_lock().holder("5511").await.unwrap().unwrap().owner_id,
        "worker-a"
    );

    assert!(a.release_session("5511").await.unwrap());
    assert!(a.session_lock().holder("5511").await.unwrap().is_none());
    assert!(!a.release_session("5511").await.unwrap());

    assert!(b.acquire_session("5511").await.unwrap());
}

#[tokio::test]
async fn test_acquire_is_one_backend_call() {
    let backend = Arc::new(CountingBackend::default());
    let lock = SessionLock::new(backend.clone(), Arc::new(ManualClock::at_secs(T0_SECS)));

    assert!(lock.try_acquire("5511", "worker-1").await.unwrap());
    assert!(!lock.try_acquire("5511", "worker-2").await.unwrap());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_locks_are_per_session() {
    let (sdk, _) = memory_sdk("worker-1");
    assert!(sdk.acquire_session("1").await.unwrap());
    assert!(sdk.acquire_session("2").await.unwrap());
    assert!(!sdk.acquire_session("1").await.unwrap());
}

#[tokio::test]
async fn test_backend_failure_is_not_a_refusal() {
    let lock = SessionLock::new(
        Arc::new(FailingBackend),
        Arc::new(ManualClock::at_secs(T0_SECS)),
    );

    let err = lock.try_acquire("5511", "worker-1").await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, SdkError::Transport(_)));

    let err = lock.release("5511", "worker-1").await.unwrap_err();
    assert!(err.is_transport());

    assert!(lock.holder("5511").await.is_err());
}
