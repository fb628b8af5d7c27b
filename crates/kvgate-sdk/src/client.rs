// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Main SDK entry point.

use std::fmt;
use std::sync::Arc;

use kvgate_client::GatewayClient;
use tracing::{info, instrument};

use crate::backend::KvBackend;
use crate::backend::http::HttpBackend;
use crate::chatbot::ChatbotStore;
use crate::clock::{Clock, SystemClock};
use crate::conversation::ConversationCache;
use crate::config::SdkConfig;
use crate::error::Result;
use crate::heartbeat::HeartbeatHandle;
use crate::liveness::LivenessRegistry;
use crate::lock::SessionLock;

/// High-level SDK for workers coordinating through the key-value gateway.
///
/// This wraps a backend (the gateway over HTTP, or any other [`KvBackend`])
/// and hands out the coordination services built on it. Services are cheap
/// to create and share the backend.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use kvgate_sdk::{KvGateSdk, SdkConfig};
///
/// # async fn example() -> kvgate_sdk::Result<()> {
/// let sdk = KvGateSdk::new(SdkConfig::localhost("worker-1"))?;
///
/// // Keep this worker visible to the group
/// let _heartbeat = sdk.start_heartbeat("agents");
///
/// if sdk.acquire_session("5511999").await? {
///     // ... handle the conversation ...
///     sdk.release_session("5511999").await?;
/// }
///
/// let dead = sdk.liveness().audit_dead("agents", Duration::from_secs(120)).await?;
/// sdk.liveness().cleanup("agents", &dead).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct KvGateSdk {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    config: SdkConfig,
    client: Option<GatewayClient>,
}

impl KvGateSdk {
    /// Create an SDK talking to the gateway described by `config`.
    pub fn new(config: SdkConfig) -> Result<Self> {
        let client = GatewayClient::new(config.client.clone())?;
        let backend = Arc::new(HttpBackend::new(client.clone()));

        info!(
            worker_id = %config.worker_id,
            base_url = %config.client.base_url,
            "SDK created with gateway backend"
        );

        Ok(Self {
            backend,
            clock: Arc::new(SystemClock),
            config,
            client: Some(client),
        })
    }

    /// Create an SDK from environment variables. See [`SdkConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(SdkConfig::from_env()?)
    }

    /// Create an SDK for a gateway on localhost.
    pub fn localhost(worker_id: impl Into<String>) -> Result<Self> {
        Self::new(SdkConfig::localhost(worker_id))
    }

    /// Create an SDK over an arbitrary backend and clock.
    pub fn with_backend(
        backend: Arc<dyn KvBackend>,
        clock: Arc<dyn Clock>,
        config: SdkConfig,
    ) -> Self {
        Self {
            backend,
            clock,
            config,
            client: None,
        }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    /// The gateway client, when the SDK was built with one.
    pub fn client(&self) -> Option<&GatewayClient> {
        self.client.as_ref()
    }

    pub fn backend(&self) -> Arc<dyn KvBackend> {
        self.backend.clone()
    }

    pub fn session_lock(&self) -> SessionLock {
        SessionLock::new(self.backend.clone(), self.clock.clone())
    }

    pub fn liveness(&self) -> LivenessRegistry {
        LivenessRegistry::new(self.backend.clone(), self.clock.clone())
            .with_active_window(self.config.active_window())
    }

    pub fn chatbot(&self) -> ChatbotStore {
        ChatbotStore::new(self.backend.clone(), self.clock.clone())
    }

    /// A conversation cache whose message ids carry this worker's id.
    ///
    /// Each call starts with an empty local copy; keep the returned cache to
    /// reuse what it has loaded.
    pub fn conversations(&self) -> ConversationCache {
        ConversationCache::new(
            self.backend.clone(),
            self.clock.clone(),
            self.config.worker_id.clone(),
        )
    }

    /// Try to lock `session` for this worker.
    pub async fn acquire_session(&self, session: &str) -> Result<bool> {
        self.session_lock()
            .try_acquire(session, &self.config.worker_id)
            .await
    }

    /// Release this worker's lock on `session`.
    pub async fn release_session(&self, session: &str) -> Result<bool> {
        self.session_lock()
            .release(session, &self.config.worker_id)
            .await
    }

    /// Signal liveness for this worker in `group`.
    pub async fn signal(&self, group: &str) -> Result<()> {
        self.liveness()
            .signal(&self.config.worker_id, group, None)
            .await
    }

    /// Start background liveness signals for this worker in `group` at the
    /// configured interval. Returns `None` when the interval is 0.
    #[instrument(skip(self))]
    pub fn start_heartbeat(&self, group: &str) -> Option<HeartbeatHandle> {
        let interval = self.config.heartbeat_interval()?;
        Some(
            self.liveness()
                .spawn_heartbeat(self.config.worker_id.clone(), group, interval, None),
        )
    }
}

impl fmt::Debug for KvGateSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvGateSdk")
            .field("worker_id", &self.config.worker_id)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
