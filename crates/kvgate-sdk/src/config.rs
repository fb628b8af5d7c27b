// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK configuration.

use std::time::Duration;

use kvgate_client::ClientConfig;

use crate::error::{Result, SdkError};

/// Default window within which a worker counts as active.
pub const DEFAULT_ACTIVE_WINDOW_SECS: u64 = 60;

/// Default background heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// SDK configuration.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Gateway connection settings
    pub client: ClientConfig,
    /// Worker ID (required) - used as lock owner and liveness member
    pub worker_id: String,
    /// Seconds since the last signal within which a worker is active (default: 60)
    pub active_window_secs: u64,
    /// Background heartbeat interval in milliseconds (default: 30_000).
    /// Set to 0 to disable automatic heartbeats.
    pub heartbeat_interval_ms: u64,
}

impl SdkConfig {
    /// Load configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `KVGATE_WORKER_ID` - Identifier of this worker process
    ///
    /// # Optional Environment Variables
    /// - `KVGATE_BASE_URL`, `KVGATE_API_VERSION`, `KVGATE_API_KEY`,
    ///   `KVGATE_REQUEST_TIMEOUT_MS` - see [`ClientConfig::from_env`]
    /// - `KVGATE_ACTIVE_WINDOW_SECS` - Active window for health stats (default: 60)
    /// - `KVGATE_HEARTBEAT_INTERVAL_MS` - Background heartbeat interval (default: 30000, 0 to disable)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = ClientConfig::from_lookup(&lookup)?;

        let worker_id = lookup("KVGATE_WORKER_ID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SdkError::Config("KVGATE_WORKER_ID is required".to_string()))?;

        let active_window_secs = parse_u64(
            &lookup,
            "KVGATE_ACTIVE_WINDOW_SECS",
            DEFAULT_ACTIVE_WINDOW_SECS,
        )?;
        let heartbeat_interval_ms = parse_u64(
            &lookup,
            "KVGATE_HEARTBEAT_INTERVAL_MS",
            DEFAULT_HEARTBEAT_INTERVAL_MS,
        )?;

        Ok(Self {
            client,
            worker_id,
            active_window_secs,
            heartbeat_interval_ms,
        })
    }

    /// Create a new configuration with the given worker ID and default gateway settings.
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            client: ClientConfig::default(),
            worker_id: worker_id.into(),
            active_window_secs: DEFAULT_ACTIVE_WINDOW_SECS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
        }
    }

    /// Create a configuration for a gateway on `localhost:11911`.
    pub fn localhost(worker_id: impl Into<String>) -> Self {
        Self::new(worker_id).with_client(ClientConfig::localhost())
    }

    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    pub fn with_active_window_secs(mut self, secs: u64) -> Self {
        self.active_window_secs = secs;
        self
    }

    /// Set the background heartbeat interval.
    /// Set to 0 to disable automatic heartbeats.
    pub fn with_heartbeat_interval_ms(mut self, interval_ms: u64) -> Self {
        self.heartbeat_interval_ms = interval_ms;
        self
    }

    pub fn active_window(&self) -> Duration {
        Duration::from_secs(self.active_window_secs)
    }

    /// Heartbeat interval, or `None` when automatic heartbeats are off.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }
}

fn parse_u64<F>(lookup: &F, name: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| SdkError::Config(format!("invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = SdkConfig::new("worker-1");
        assert_eq!(config.worker_id, "worker-1");
        assert_eq!(config.active_window_secs, 60);
        assert_eq!(config.heartbeat_interval_ms, 30_000);
        assert_eq!(config.heartbeat_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builder_pattern() {
        let config = SdkConfig::localhost("worker-1")
            .with_active_window_secs(120)
            .with_heartbeat_interval_ms(0);

        assert_eq!(config.active_window(), Duration::from_secs(120));
        assert_eq!(config.heartbeat_interval(), None);
    }
}
