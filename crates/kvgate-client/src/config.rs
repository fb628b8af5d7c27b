// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the gateway client.

use std::time::Duration;

use crate::error::{ClientError, Result};

/// Default gateway address used by local deployments.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11911";

/// Configuration for the GatewayClient.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway base URL, without the `/api/{version}` suffix.
    pub base_url: String,
    /// API version segment (default: "v1").
    pub api_version: String,
    /// Bearer token sent in the `Authorization` header.
    pub api_key: Option<String>,
    /// Request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: "v1".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a configuration pointing at the given gateway.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Create a configuration for localhost development.
    pub fn localhost() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `KVGATE_BASE_URL`: Gateway URL (default: "http://localhost:11911")
    /// - `KVGATE_API_VERSION`: API version segment (default: "v1")
    /// - `KVGATE_API_KEY`: Bearer token (optional)
    /// - `KVGATE_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 10000)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("KVGATE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "invalid KVGATE_BASE_URL: {} (expected http:// or https://)",
                base_url
            )));
        }

        let api_version = lookup("KVGATE_API_VERSION").unwrap_or_else(|| "v1".to_string());

        let api_key = lookup("KVGATE_API_KEY").filter(|key| !key.is_empty());

        let request_timeout_ms: u64 = lookup("KVGATE_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid KVGATE_REQUEST_TIMEOUT_MS: {}", e)))?;

        Ok(Self {
            base_url,
            api_version,
            api_key,
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the API version segment.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Root of the versioned API, e.g. `http://localhost:11911/api/v1`.
    pub fn api_root(&self) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version
        )
    }
}
