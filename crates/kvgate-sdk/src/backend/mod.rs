// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage backends for SDK operations.
//!
//! This module provides two backends:
//! - `http`: the key-value gateway over HTTP (default)
//! - `memory`: an in-process store with the same semantics, for tests and
//!   single-process deployments

pub mod http;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use kvgate_client::{ScoreBound, ScoredMember};

use crate::error::Result;

/// The store primitives the coordination layer is built on.
///
/// Every method is a single round trip. A backend must never turn a failed
/// call into an empty or negative answer.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Set `field` on the hash at `key` only if it is absent. Returns whether
    /// the write happened. Must be atomic across all callers of the store.
    async fn cond_set_field(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>>;

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// All fields of a hash. A missing key is an empty map.
    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Remove one field. Returns whether it was present.
    async fn delete_field(&self, key: &str, field: &str) -> Result<bool>;

    /// Remove several fields at once. Returns how many were present.
    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<u64>;

    /// Insert or update members of a sorted set.
    async fn sorted_set_upsert(&self, key: &str, members: &[ScoredMember]) -> Result<()>;

    /// Members with score in `[min, max]`, ascending by score.
    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>>;

    /// Like [`KvBackend::sorted_set_range_by_score`], with scores.
    async fn sorted_set_range_by_score_with_scores(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<ScoredMember>>;

    /// Members with scores by rank. Negative indices count from the end.
    async fn sorted_set_range(&self, key: &str, start: i64, stop: i64)
    -> Result<Vec<ScoredMember>>;

    /// Remove members. Returns how many were present.
    async fn sorted_set_remove(&self, key: &str, members: &[String]) -> Result<u64>;

    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64>;

    /// Push values onto the head of a list, in order. Returns the new length.
    async fn list_push_left(&self, key: &str, values: &[String]) -> Result<u64>;

    /// Elements by index. Negative indices count from the end.
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;

    /// Keep only the elements in `[start, stop]`.
    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<()>;

    /// Add members to a set. Returns how many were new.
    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64>;

    /// Every member of a set, sorted. A missing key is an empty set.
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Remove members from a set. Returns how many were present.
    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64>;

    /// Read a string value.
    async fn get_value(&self, key: &str) -> Result<Option<String>>;

    async fn set_value(&self, key: &str, value: &str) -> Result<()>;

    /// Delete keys of any type. Returns how many existed.
    async fn delete_keys(&self, keys: &[String]) -> Result<u64>;

    /// How many of `keys` exist.
    async fn keys_exist(&self, keys: &[String]) -> Result<u64>;

    /// Every key matching a glob pattern (`*`, `?`, `[abc]`), sorted.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Resolve Redis-style inclusive `[start, stop]` indices against a length.
pub(crate) fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(5, 0, -1), Some((0, 4)));
        assert_eq!(resolve_range(5, -1, -1), Some((4, 4)));
        assert_eq!(resolve_range(5, 1, 100), Some((1, 4)));
        assert_eq!(resolve_range(5, -100, 1), Some((0, 1)));
        assert_eq!(resolve_range(5, 3, 2), None);
        assert_eq!(resolve_range(5, 5, 9), None);
        assert_eq!(resolve_range(0, 0, -1), None);
        assert_eq!(resolve_range(3, 0, -4), None);
    }
}
