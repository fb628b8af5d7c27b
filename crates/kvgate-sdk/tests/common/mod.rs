// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test backends for kvgate-sdk integration tests.
//!
//! - `FailingBackend` fails every call with a transport error
//! - `CountingBackend` wraps a `MemoryBackend` and counts calls

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use kvgate_sdk::kvgate_client::ClientError;
use kvgate_sdk::{
    KvBackend, KvGateSdk, ManualClock, MemoryBackend, Result, ScoreBound, ScoredMember, SdkConfig,
    SdkError,
};

pub const T0_SECS: i64 = 1_700_000_000;

/// SDK over a fresh in-memory store and a manual clock at `T0_SECS`.
pub fn memory_sdk(worker_id: &str) -> (KvGateSdk, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_secs(T0_SECS));
    let sdk = KvGateSdk::with_backend(
        Arc::new(MemoryBackend::new()),
        clock.clone(),
        SdkConfig::new(worker_id),
    );
    (sdk, clock)
}

fn unreachable() -> SdkError {
    SdkError::Transport(ClientError::Connection("connection refused".to_string()))
}

/// Backend whose store is unreachable.
#[derive(Debug, Default)]
pub struct FailingBackend;

#[async_trait]
impl KvBackend for FailingBackend {
    async fn cond_set_field(&self, _: &str, _: &str, _: &str) -> Result<bool> {
        Err(unreachable())
    }
    async fn get_field(&self, _: &str, _: &str) -> Result<Option<String>> {
        Err(unreachable())
    }
    async fn set_field(&self, _: &str, _: &str, _: &str) -> Result<()> {
        Err(unreachable())
    }
    async fn get_all_fields(&self, _: &str) -> Result<HashMap<String, String>> {
        Err(unreachable())
    }
    async fn delete_field(&self, _: &str, _: &str) -> Result<bool> {
        Err(unreachable())
    }
    async fn delete_fields(&self, _: &str, _: &[String]) -> Result<u64> {
        Err(unreachable())
    }
    async fn sorted_set_upsert(&self, _: &str, _: &[ScoredMember]) -> Result<()> {
        Err(unreachable())
    }
    async fn sorted_set_range_by_score(
        &self,
        _: &str,
        _: ScoreBound,
        _: ScoreBound,
    ) -> Result<Vec<String>> {
        Err(unreachable())
    }
    async fn sorted_set_range_by_score_with_scores(
        &self,
        _: &str,
        _: ScoreBound,
        _: ScoreBound,
    ) -> Result<Vec<ScoredMember>> {
        Err(unreachable())
    }
    async fn sorted_set_range(&self, _: &str, _: i64, _: i64) -> Result<Vec<ScoredMember>> {
        Err(unreachable())
    }
    async fn sorted_set_remove(&self, _: &str, _: &[String]) -> Result<u64> {
        Err(unreachable())
    }
    async fn sorted_set_cardinality(&self, _: &str) -> Result<u64> {
        Err(unreachable())
    }
    async fn list_push_left(&self, _: &str, _: &[String]) -> Result<u64> {
        Err(unreachable())
    }
    async fn list_range(&self, _: &str, _: i64, _: i64) -> Result<Vec<String>> {
        Err(unreachable())
    }
    async fn list_trim(&self, _: &str, _: i64, _: i64) -> Result<()> {
        Err(unreachable())
    }
    async fn set_add(&self, _: &str, _: &[String]) -> Result<u64> {
        Err(unreachable())
    }
    async fn set_members(&self, _: &str) -> Result<Vec<String>> {
        Err(unreachable())
    }
    async fn set_remove(&self, _: &str, _: &[String]) -> Result<u64> {
        Err(unreachable())
    }
    async fn get_value(&self, _: &str) -> Result<Option<String>> {
        Err(unreachable())
    }
    async fn set_value(&self, _: &str, _: &str) -> Result<()> {
        Err(unreachable())
    }
    async fn delete_keys(&self, _: &[String]) -> Result<u64> {
        Err(unreachable())
    }
    async fn keys_exist(&self, _: &[String]) -> Result<u64> {
        Err(unreachable())
    }
    async fn scan_keys(&self, _: &str) -> Result<Vec<String>> {
        Err(unreachable())
    }
}

/// In-memory backend that counts every call and sorted-set upserts separately.
#[derive(Debug, Default)]
pub struct CountingBackend {
    inner: MemoryBackend,
    calls: AtomicUsize,
    upserts: AtomicUsize,
}

impl CountingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvBackend for CountingBackend {
    async fn cond_set_field(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.hit();
        self.inner.cond_set_field(key, field, value).await
    }
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.hit();
        self.inner.get_field(key, field).await
    }
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hit();
        self.inner.set_field(key, field, value).await
    }
    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        self.hit();
        self.inner.get_all_fields(key).await
    }
    async fn delete_field(&self, key: &str, field: &str) -> Result<bool> {
        self.hit();
        self.inner.delete_field(key, field).await
    }
    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<u64> {
        self.hit();
        self.inner.delete_fields(key, fields).await
    }
    async fn sorted_set_upsert(&self, key: &str, members: &[ScoredMember]) -> Result<()> {
        self.hit();
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.sorted_set_upsert(key, members).await
    }
    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>> {
        self.hit();
        self.inner.sorted_set_range_by_score(key, min, max).await
    }
    async fn sorted_set_range_by_score_with_scores(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<ScoredMember>> {
        self.hit();
        self.inner
            .sorted_set_range_by_score_with_scores(key, min, max)
            .await
    }
    async fn sorted_set_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<ScoredMember>> {
        self.hit();
        self.inner.sorted_set_range(key, start, stop).await
    }
    async fn sorted_set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        self.hit();
        self.inner.sorted_set_remove(key, members).await
    }
    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64> {
        self.hit();
        self.inner.sorted_set_cardinality(key).await
    }
    async fn list_push_left(&self, key: &str, values: &[String]) -> Result<u64> {
        self.hit();
        self.inner.list_push_left(key, values).await
    }
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        self.hit();
        self.inner.list_range(key, start, stop).await
    }
    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        self.hit();
        self.inner.list_trim(key, start, stop).await
    }
    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64> {
        self.hit();
        self.inner.set_add(key, members).await
    }
    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.hit();
        self.inner.set_members(key).await
    }
    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        self.hit();
        self.inner.set_remove(key, members).await
    }
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.hit();
        self.inner.get_value(key).await
    }
    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.hit();
        self.inner.set_value(key, value).await
    }
    async fn delete_keys(&self, keys: &[String]) -> Result<u64> {
        self.hit();
        self.inner.delete_keys(keys).await
    }
    async fn keys_exist(&self, keys: &[String]) -> Result<u64> {
        self.hit();
        self.inner.keys_exist(keys).await
    }
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.hit();
        self.inner.scan_keys(pattern).await
    }
}
