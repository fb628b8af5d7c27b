// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Gateway-backed storage.

use std::collections::HashMap;

use async_trait::async_trait;
use kvgate_client::{GatewayClient, ScoreBound, ScoredMember};
use tracing::instrument;

use super::KvBackend;
use crate::error::Result;

/// [`KvBackend`] over the key-value gateway.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: GatewayClient,
}

impl HttpBackend {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }
}

#[async_trait]
impl KvBackend for HttpBackend {
    #[instrument(skip(self, value))]
    async fn cond_set_field(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        Ok(self.client.hashes().set_if_absent(key, field, value).await?)
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self.client.hashes().get(key, field).await?)
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        Ok(self.client.hashes().set(key, field, value).await?)
    }

    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.client.hashes().get_all(key).await?)
    }

    #[instrument(skip(self))]
    async fn delete_field(&self, key: &str, field: &str) -> Result<bool> {
        Ok(self.client.hashes().delete(key, field).await?)
    }

    #[instrument(skip(self, fields), fields(count = fields.len()))]
    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<u64> {
        Ok(self.client.hashes().delete_many(key, fields).await?)
    }

    async fn sorted_set_upsert(&self, key: &str, members: &[ScoredMember]) -> Result<()> {
        self.client.sorted_sets().add(key, members).await?;
        Ok(())
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>> {
        Ok(self.client.sorted_sets().range_by_score(key, min, max).await?)
    }

    async fn sorted_set_range_by_score_with_scores(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<ScoredMember>> {
        Ok(self
            .client
            .sorted_sets()
            .range_by_score_with_scores(key, min, max)
            .await?)
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<ScoredMember>> {
        Ok(self
            .client
            .sorted_sets()
            .range_with_scores(key, start, stop)
            .await?)
    }

    async fn sorted_set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        Ok(self.client.sorted_sets().remove(key, members).await?)
    }

    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64> {
        Ok(self.client.sorted_sets().cardinality(key).await?)
    }

    async fn list_push_left(&self, key: &str, values: &[String]) -> Result<u64> {
        Ok(self.client.lists().push_left(key, values).await?)
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        Ok(self.client.lists().range(key, start, stop).await?)
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        Ok(self.client.lists().trim(key, start, stop).await?)
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64> {
        Ok(self.client.sets().add(key, members).await?)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut members = self.client.sets().members(key).await?;
        members.sort();
        Ok(members)
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        Ok(self.client.sets().remove(key, members).await?)
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.client.keys().get(key).await?)
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.client.keys().set(key, value, None).await?)
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<u64> {
        Ok(self.client.keys().del(keys).await?)
    }

    async fn keys_exist(&self, keys: &[String]) -> Result<u64> {
        Ok(self.client.keys().exists(keys).await?)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self.client.keys().scan_all(pattern).await?)
    }
}
