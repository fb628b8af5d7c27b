// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Chatbot state: flows, sessions, AI context and caches.
//!
//! Layout:
//! - `neurohive:flows` hash of flow name to JSON [`FlowConfig`]
//! - `session:phone:{phone}` hash of session fields, including the lock
//! - `context:ai:{phone}` list of JSON [`AiContextMessage`], newest first
//! - `cache:{name}` hash of cached values

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use tracing::{debug, info, instrument};

use crate::backend::KvBackend;
use crate::clock::Clock;
use crate::error::{Result, SdkError, require_non_empty};
use crate::keys::{
    CACHE_PATTERN, FLOWS_KEY, SESSION_LOCK_FIELD, SESSION_PATTERN, SESSION_UPDATED_AT_FIELD,
    ai_context_key, cache_key, session_key,
};
use crate::lock::SessionLock;
use crate::types::{AiContextMessage, ChatbotStats, FlowConfig, Role};

/// Chatbot operations over a [`KvBackend`].
#[derive(Clone)]
pub struct ChatbotStore {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    lock: SessionLock,
}

impl ChatbotStore {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        let lock = SessionLock::new(backend.clone(), clock.clone());
        Self {
            backend,
            clock,
            lock,
        }
    }

    fn timestamp(&self) -> Result<String> {
        let millis = self.clock.now_millis();
        DateTime::from_timestamp_millis(millis)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .ok_or_else(|| SdkError::InvalidInput(format!("clock out of range: {}", millis)))
    }

    // Flows

    pub async fn get_flow_config(&self, name: &str) -> Result<Option<FlowConfig>> {
        require_non_empty("flow name", name)?;

        let Some(raw) = self.backend.get_field(FLOWS_KEY, name).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| SdkError::Serialization(format!("flow {}: {}", name, e)))
    }

    #[instrument(skip(self, config))]
    pub async fn save_flow_config(&self, name: &str, config: &FlowConfig) -> Result<()> {
        require_non_empty("flow name", name)?;

        let raw = serde_json::to_string(config)?;
        self.backend.set_field(FLOWS_KEY, name, &raw).await?;
        info!(steps = config.steps.len(), "Flow saved");
        Ok(())
    }

    /// Names of all stored flows, sorted.
    pub async fn list_flows(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .backend
            .get_all_fields(FLOWS_KEY)
            .await?
            .into_keys()
            .collect();
        names.sort();
        Ok(names)
    }

    // Sessions

    pub async fn get_session(&self, phone: &str) -> Result<HashMap<String, String>> {
        require_non_empty("phone", phone)?;
        self.backend.get_all_fields(&session_key(phone)).await
    }

    /// Write session fields and stamp `updatedAt`. The lock field can only be
    /// changed through the lock operations.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn update_session(&self, phone: &str, updates: &[(&str, &str)]) -> Result<()> {
        require_non_empty("phone", phone)?;
        if updates.iter().any(|(name, _)| *name == SESSION_LOCK_FIELD) {
            return Err(SdkError::InvalidInput(format!(
                "{} is managed by the session lock",
                SESSION_LOCK_FIELD
            )));
        }

        let key = session_key(phone);
        let updated_at = self.timestamp()?;
        for (name, value) in updates {
            self.backend.set_field(&key, name, value).await?;
        }
        self.backend
            .set_field(&key, SESSION_UPDATED_AT_FIELD, &updated_at)
            .await?;

        debug!("Session updated");
        Ok(())
    }

    /// Remove every session field except the lock. Returns how many were removed.
    #[instrument(skip(self))]
    pub async fn clear_session(&self, phone: &str) -> Result<u64> {
        require_non_empty("phone", phone)?;

        let key = session_key(phone);
        let fields: Vec<String> = self
            .backend
            .get_all_fields(&key)
            .await?
            .into_keys()
            .filter(|name| name != SESSION_LOCK_FIELD)
            .collect();
        let removed = self.backend.delete_fields(&key, &fields).await?;

        info!(removed, "Session cleared");
        Ok(removed)
    }

    pub async fn has_active_session(&self, phone: &str) -> Result<bool> {
        require_non_empty("phone", phone)?;
        Ok(self.backend.keys_exist(&[session_key(phone)]).await? > 0)
    }

    // AI context

    /// Raw entries, newest first.
    pub async fn get_ai_context(&self, phone: &str, count: usize) -> Result<Vec<String>> {
        require_non_empty("phone", phone)?;
        if count == 0 {
            return Ok(Vec::new());
        }
        self.backend
            .list_range(&ai_context_key(phone), 0, count as i64 - 1)
            .await
    }

    /// Prepend a message and keep at most `max_len` entries (`0` keeps all).
    #[instrument(skip(self, message))]
    pub async fn push_ai_context(
        &self,
        phone: &str,
        role: Role,
        message: &str,
        max_len: usize,
    ) -> Result<()> {
        require_non_empty("phone", phone)?;

        let entry = AiContextMessage {
            role,
            message: message.to_string(),
            timestamp: self.timestamp()?,
        };
        let key = ai_context_key(phone);
        let len = self
            .backend
            .list_push_left(&key, &[serde_json::to_string(&entry)?])
            .await?;

        if max_len > 0 && len > max_len as u64 {
            self.backend.list_trim(&key, 0, max_len as i64 - 1).await?;
        }
        Ok(())
    }

    pub async fn clear_ai_context(&self, phone: &str) -> Result<()> {
        require_non_empty("phone", phone)?;
        // An empty range removes the list.
        self.backend.list_trim(&ai_context_key(phone), 1, 0).await
    }

    /// Up to `count` recent messages in chronological order. Entries that are
    /// not valid messages are returned as user messages stamped now.
    pub async fn get_formatted_ai_context(
        &self,
        phone: &str,
        count: usize,
    ) -> Result<Vec<AiContextMessage>> {
        let raw = self.get_ai_context(phone, count).await?;
        let mut messages = Vec::with_capacity(raw.len());
        for entry in raw {
            let message = match serde_json::from_str::<AiContextMessage>(&entry) {
                Ok(message) => message,
                Err(_) => AiContextMessage {
                    role: Role::User,
                    message: entry,
                    timestamp: self.timestamp()?,
                },
            };
            messages.push(message);
        }
        messages.reverse();
        Ok(messages)
    }

    // Caches

    pub async fn get_cache_item(&self, cache: &str, field: &str) -> Result<Option<String>> {
        require_non_empty("cache name", cache)?;
        self.backend.get_field(&cache_key(cache), field).await
    }

    pub async fn set_cache_item(&self, cache: &str, field: &str, value: &str) -> Result<()> {
        require_non_empty("cache name", cache)?;
        self.backend.set_field(&cache_key(cache), field, value).await
    }

    // Locks

    pub async fn try_acquire_lock(&self, phone: &str, worker_id: &str) -> Result<bool> {
        self.lock.try_acquire(phone, worker_id).await
    }

    pub async fn release_lock(&self, phone: &str, worker_id: &str) -> Result<bool> {
        self.lock.release(phone, worker_id).await
    }

    pub fn session_lock(&self) -> &SessionLock {
        &self.lock
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<ChatbotStats> {
        let total_sessions = self.backend.scan_keys(SESSION_PATTERN).await?.len() as u64;
        let total_flows = self.backend.get_all_fields(FLOWS_KEY).await?.len() as u64;
        let total_caches = self.backend.scan_keys(CACHE_PATTERN).await?.len() as u64;

        Ok(ChatbotStats {
            total_sessions,
            total_flows,
            total_caches,
        })
    }
}

impl fmt::Debug for ChatbotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatbotStore").finish_non_exhaustive()
    }
}
