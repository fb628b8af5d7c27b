// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker liveness tracking.
//!
//! Each group is a sorted set `agent:health:{group}` mapping worker id to the
//! epoch second of its last signal. Staleness is never stored; it is derived
//! at audit time from the score and the caller's timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kvgate_client::{ScoreBound, ScoredMember};
use tracing::{debug, info, instrument};

use crate::backend::KvBackend;
use crate::clock::Clock;
use crate::config::DEFAULT_ACTIVE_WINDOW_SECS;
use crate::error::{Result, SdkError, require_non_empty};
use crate::heartbeat::HeartbeatHandle;
use crate::keys::{health_key, health_ttl_key};
use crate::types::{HealthStats, WorkerHeartbeat};

/// Liveness operations over a [`KvBackend`].
#[derive(Clone)]
pub struct LivenessRegistry {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    active_window: Duration,
}

impl LivenessRegistry {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            active_window: Duration::from_secs(DEFAULT_ACTIVE_WINDOW_SECS),
        }
    }

    /// Window used by [`health_stats`](Self::health_stats) and as the default
    /// for [`list_active_workers`](Self::list_active_workers).
    pub fn with_active_window(mut self, window: Duration) -> Self {
        self.active_window = window;
        self
    }

    pub fn active_window(&self) -> Duration {
        self.active_window
    }

    fn now_secs(&self) -> i64 {
        self.clock.now_secs()
    }

    /// Now minus `age`, in milliseconds. Saturates instead of wrapping.
    fn millis_ago(&self, name: &str, age: Duration) -> Result<i64> {
        let age = i64::try_from(age.as_millis())
            .map_err(|_| SdkError::InvalidInput(format!("{} out of range: {:?}", name, age)))?;
        Ok(self.clock.now_millis().saturating_sub(age))
    }

    /// Lowest last-seen second that still counts as seen within `age`.
    fn seen_since(&self, name: &str, age: Duration) -> Result<i64> {
        let millis = self.millis_ago(name, age)?;
        Ok(millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) != 0))
    }

    /// Record that `worker_id` is alive now.
    ///
    /// With a `ttl_hint` the worker also declares how long it may stay silent;
    /// [`audit_expired`](Self::audit_expired) reports it once that is exceeded.
    /// Signalling without a hint withdraws any hint declared earlier.
    #[instrument(skip(self))]
    pub async fn signal(
        &self,
        worker_id: &str,
        group: &str,
        ttl_hint: Option<Duration>,
    ) -> Result<()> {
        require_non_empty("worker id", worker_id)?;
        require_non_empty("group", group)?;
        let ttl_secs = ttl_hint
            .map(|ttl| {
                i64::try_from(ttl.as_secs()).map_err(|_| {
                    SdkError::InvalidInput(format!("ttl hint out of range: {:?}", ttl))
                })
            })
            .transpose()?;

        let now = self.now_secs();
        self.backend
            .sorted_set_upsert(&health_key(group), &[ScoredMember::new(worker_id, now as f64)])
            .await?;

        let ttl_key = health_ttl_key(group);
        match ttl_secs {
            Some(ttl) => {
                self.backend
                    .set_field(&ttl_key, worker_id, &ttl.to_string())
                    .await?
            }
            None => {
                self.backend.delete_field(&ttl_key, worker_id).await?;
            }
        }

        debug!(last_seen = now, "Liveness signal recorded");
        Ok(())
    }

    /// Workers whose last signal is at least `timeout` old, oldest first.
    #[instrument(skip(self))]
    pub async fn audit_dead(&self, group: &str, timeout: Duration) -> Result<Vec<String>> {
        require_non_empty("group", group)?;

        let dead_before = self.millis_ago("timeout", timeout)?.div_euclid(1000);
        let dead = self
            .backend
            .sorted_set_range_by_score(
                &health_key(group),
                ScoreBound::Inclusive(0.0),
                ScoreBound::Inclusive(dead_before as f64),
            )
            .await?;

        if !dead.is_empty() {
            info!(count = dead.len(), "Dead workers found");
        }
        Ok(dead)
    }

    /// Workers that outlived their own ttl hint, oldest first. Workers that
    /// never declared one are skipped.
    #[instrument(skip(self))]
    pub async fn audit_expired(&self, group: &str) -> Result<Vec<String>> {
        require_non_empty("group", group)?;

        let ttls = self.backend.get_all_fields(&health_ttl_key(group)).await?;
        if ttls.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.now_secs();
        let members = self
            .backend
            .sorted_set_range_by_score_with_scores(
                &health_key(group),
                ScoreBound::NegInf,
                ScoreBound::PosInf,
            )
            .await?;

        let mut expired = Vec::new();
        for m in members {
            let Some(raw) = ttls.get(&m.member) else {
                continue;
            };
            let ttl: i64 = raw.parse().map_err(|_| {
                SdkError::MalformedResponse(format!("ttl hint for {}: {:?}", m.member, raw))
            })?;
            if (m.score as i64).saturating_add(ttl) < now {
                expired.push(m.member);
            }
        }
        Ok(expired)
    }

    /// Remove workers from the group along with any ttl hints, in two round
    /// trips regardless of how many workers are named.
    #[instrument(skip(self), fields(count = worker_ids.len()))]
    pub async fn cleanup(&self, group: &str, worker_ids: &[String]) -> Result<()> {
        if worker_ids.is_empty() {
            return Ok(());
        }
        require_non_empty("group", group)?;

        let removed = self
            .backend
            .sorted_set_remove(&health_key(group), worker_ids)
            .await?;
        let hints = self
            .backend
            .delete_fields(&health_ttl_key(group), worker_ids)
            .await?;

        info!(removed, hints, "Workers removed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn health_stats(&self, group: &str) -> Result<HealthStats> {
        require_non_empty("group", group)?;
        let key = health_key(group);

        let total_workers = self.backend.sorted_set_cardinality(&key).await?;

        let active_since = self.seen_since("active window", self.active_window)?;
        let active_workers = self
            .backend
            .sorted_set_range_by_score(
                &key,
                ScoreBound::Inclusive(active_since as f64),
                ScoreBound::PosInf,
            )
            .await?
            .len() as u64;

        let last_activity = self
            .backend
            .sorted_set_range(&key, -1, -1)
            .await?
            .first()
            .map(|m| m.score as i64);

        Ok(HealthStats {
            total_workers,
            active_workers,
            dead_workers: total_workers.saturating_sub(active_workers),
            last_activity,
        })
    }

    /// Workers seen within `max_age` (the active window when `None`), oldest first.
    pub async fn list_active_workers(
        &self,
        group: &str,
        max_age: Option<Duration>,
    ) -> Result<Vec<WorkerHeartbeat>> {
        require_non_empty("group", group)?;

        let max_age = max_age.unwrap_or(self.active_window);
        let since = self.seen_since("max age", max_age)?;
        let members = self
            .backend
            .sorted_set_range_by_score_with_scores(
                &health_key(group),
                ScoreBound::Inclusive(since as f64),
                ScoreBound::PosInf,
            )
            .await?;

        Ok(members
            .into_iter()
            .map(|m| WorkerHeartbeat {
                worker_id: m.member,
                last_seen_epoch_seconds: m.score as i64,
            })
            .collect())
    }

    /// Signal now and then every `interval` from a background task.
    ///
    /// Failed signals are logged and retried on the next tick. The task stops
    /// when the returned handle is stopped or dropped.
    pub fn spawn_heartbeat(
        &self,
        worker_id: impl Into<String>,
        group: impl Into<String>,
        interval: Duration,
        ttl_hint: Option<Duration>,
    ) -> HeartbeatHandle {
        HeartbeatHandle::spawn(self.clone(), worker_id.into(), group.into(), interval, ttl_hint)
    }
}

impl fmt::Debug for LivenessRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessRegistry")
            .field("active_window", &self.active_window)
            .finish_non_exhaustive()
    }
}
