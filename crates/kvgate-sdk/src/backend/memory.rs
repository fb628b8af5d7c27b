// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process storage.
//!
//! All state sits behind one mutex, so every primitive is atomic with respect
//! to every other caller sharing the same [`MemoryBackend`]. A key holds one
//! type at a time; using it as another type fails the way the store does.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use kvgate_client::{ScoreBound, ScoredMember};
use tokio::sync::Mutex;

use super::{KvBackend, resolve_range};
use crate::error::{Result, SdkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Hash,
    SortedSet,
    List,
    Set,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::String => "string",
            Kind::Hash => "hash",
            Kind::SortedSet => "zset",
            Kind::List => "list",
            Kind::Set => "set",
        })
    }
}

#[derive(Debug, Default)]
struct State {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    sorted_sets: HashMap<String, HashMap<String, f64>>,
    lists: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl State {
    fn kind_of(&self, key: &str) -> Option<Kind> {
        if self.strings.contains_key(key) {
            Some(Kind::String)
        } else if self.hashes.contains_key(key) {
            Some(Kind::Hash)
        } else if self.sorted_sets.contains_key(key) {
            Some(Kind::SortedSet)
        } else if self.lists.contains_key(key) {
            Some(Kind::List)
        } else if self.sets.contains_key(key) {
            Some(Kind::Set)
        } else {
            None
        }
    }

    /// Fail when `key` exists with a type other than `kind`.
    fn check_type(&self, key: &str, kind: Kind) -> Result<()> {
        match self.kind_of(key) {
            Some(found) if found != kind => Err(SdkError::InvalidInput(format!(
                "WRONGTYPE {} holds a {}, not a {}",
                key, found, kind
            ))),
            _ => Ok(()),
        }
    }

    fn remove_key(&mut self, key: &str) -> bool {
        self.strings.remove(key).is_some()
            || self.hashes.remove(key).is_some()
            || self.sorted_sets.remove(key).is_some()
            || self.lists.remove(key).is_some()
            || self.sets.remove(key).is_some()
    }

    /// Sorted set members ordered by score, ties broken by member.
    fn ordered(&self, key: &str) -> Vec<ScoredMember> {
        let mut members: Vec<ScoredMember> = self
            .sorted_sets
            .get(key)
            .map(|set| {
                set.iter()
                    .map(|(member, score)| ScoredMember::new(member.clone(), *score))
                    .collect()
            })
            .unwrap_or_default();
        members.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.member.cmp(&b.member))
        });
        members
    }

    fn by_score(&self, key: &str, min: ScoreBound, max: ScoreBound) -> Vec<ScoredMember> {
        self.ordered(key)
            .into_iter()
            .filter(|m| above(min, m.score) && below(max, m.score))
            .collect()
    }
}

fn above(min: ScoreBound, score: f64) -> bool {
    match min {
        ScoreBound::Inclusive(min) => score >= min,
        ScoreBound::NegInf => true,
        ScoreBound::PosInf => false,
    }
}

fn below(max: ScoreBound, score: f64) -> bool {
    match max {
        ScoreBound::Inclusive(max) => score <= max,
        ScoreBound::PosInf => true,
        ScoreBound::NegInf => false,
    }
}

/// [`KvBackend`] kept in process memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn cond_set_field(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::Hash)?;
        let hash = state.hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::Hash)?;
        Ok(state.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::Hash)?;
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::Hash)?;
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn delete_field(&self, key: &str, field: &str) -> Result<bool> {
        let removed = self.delete_fields(key, &[field.to_string()]).await?;
        Ok(removed > 0)
    }

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::Hash)?;
        let Some(hash) = state.hashes.get_mut(key) else {
            return Ok(0);
        };
        let removed = fields.iter().filter(|f| hash.remove(*f).is_some()).count();
        if hash.is_empty() {
            state.hashes.remove(key);
        }
        Ok(removed as u64)
    }

    async fn sorted_set_upsert(&self, key: &str, members: &[ScoredMember]) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::SortedSet)?;
        let set = state.sorted_sets.entry(key.to_string()).or_default();
        for m in members {
            set.insert(m.member.clone(), m.score);
        }
        Ok(())
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::SortedSet)?;
        Ok(state
            .by_score(key, min, max)
            .into_iter()
            .map(|m| m.member)
            .collect())
    }

    async fn sorted_set_range_by_score_with_scores(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<ScoredMember>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::SortedSet)?;
        Ok(state.by_score(key, min, max))
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<ScoredMember>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::SortedSet)?;
        let ordered = state.ordered(key);
        Ok(match resolve_range(ordered.len(), start, stop) {
            Some((start, stop)) => ordered[start..=stop].to_vec(),
            None => Vec::new(),
        })
    }

    async fn sorted_set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::SortedSet)?;
        let Some(set) = state.sorted_sets.get_mut(key) else {
            return Ok(0);
        };
        let removed = members.iter().filter(|m| set.remove(*m).is_some()).count();
        if set.is_empty() {
            state.sorted_sets.remove(key);
        }
        Ok(removed as u64)
    }

    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::SortedSet)?;
        Ok(state.sorted_sets.get(key).map_or(0, |s| s.len() as u64))
    }

    async fn list_push_left(&self, key: &str, values: &[String]) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::List)?;
        let list = state.lists.entry(key.to_string()).or_default();
        for value in values {
            list.push_front(value.clone());
        }
        Ok(list.len() as u64)
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::List)?;
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match resolve_range(list.len(), start, stop) {
            Some((start, stop)) => list.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::List)?;
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(());
        };
        match resolve_range(list.len(), start, stop) {
            Some((start, stop)) => {
                list.truncate(stop + 1);
                list.drain(..start);
            }
            None => {
                state.lists.remove(key);
            }
        }
        Ok(())
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::Set)?;
        let set = state.sets.entry(key.to_string()).or_default();
        Ok(members.iter().filter(|m| set.insert((*m).clone())).count() as u64)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::Set)?;
        Ok(state
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.check_type(key, Kind::Set)?;
        let Some(set) = state.sets.get_mut(key) else {
            return Ok(0);
        };
        let removed = members.iter().filter(|m| set.remove(*m)).count();
        if set.is_empty() {
            state.sets.remove(key);
        }
        Ok(removed as u64)
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.lock().await;
        state.check_type(key, Kind::String)?;
        Ok(state.strings.get(key).cloned())
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        // Plain SET replaces whatever the key held.
        state.remove_key(key);
        state.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<u64> {
        let mut state = self.state.lock().await;
        Ok(keys.iter().filter(|k| state.remove_key(k)).count() as u64)
    }

    async fn keys_exist(&self, keys: &[String]) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(keys.iter().filter(|k| state.kind_of(k).is_some()).count() as u64)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = glob::Pattern::new(pattern).map_err(|e| {
            SdkError::InvalidInput(format!("invalid key pattern {:?}: {}", pattern, e))
        })?;
        let state = self.state.lock().await;
        let mut keys: Vec<String> = state
            .strings
            .keys()
            .chain(state.hashes.keys())
            .chain(state.sorted_sets.keys())
            .chain(state.lists.keys())
            .chain(state.sets.keys())
            .filter(|k| pattern.matches(k))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
