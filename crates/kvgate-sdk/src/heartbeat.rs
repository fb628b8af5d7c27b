// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background liveness signals.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::liveness::LivenessRegistry;

/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running heartbeat task.
///
/// Dropping the handle cancels the task; [`stop`](Self::stop) also waits for
/// it to finish.
#[derive(Debug)]
pub struct HeartbeatHandle {
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatHandle {
    pub(crate) fn spawn(
        registry: LivenessRegistry,
        worker_id: String,
        group: String,
        interval: Duration,
        ttl_hint: Option<Duration>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let cancel = cancel_token.clone();

        let task = tokio::spawn(async move {
            info!(
                worker_id = %worker_id,
                group = %group,
                interval_ms = interval.as_millis() as u64,
                "Background heartbeat task started"
            );

            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Background heartbeat task cancelled");
                        break;
                    }

                    _ = ticker.tick() => {
                        if let Err(e) = registry.signal(&worker_id, &group, ttl_hint).await {
                            warn!(error = %e, "Failed to send background heartbeat");
                        } else {
                            debug!("Background heartbeat sent");
                        }
                    }
                }
            }
        });

        Self {
            cancel_token,
            task: Some(task),
        }
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the task and wait for it to exit.
    ///
    /// Returns `false` if the task panicked instead of exiting on its own.
    pub async fn stop(mut self) -> bool {
        self.cancel_token.cancel();
        let Some(task) = self.task.take() else {
            return true;
        };
        match task.await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Background heartbeat task panicked");
                false
            }
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
