// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-session mutual exclusion.
//!
//! A lock is the `sessionLock` field of the session hash, holding
//! `"{owner}:{acquired_at_millis}"`. Acquisition is a single conditional set,
//! so at most one worker ever holds a given session. Locks never expire; only
//! the owner recorded in the value can release them.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::backend::KvBackend;
use crate::clock::Clock;
use crate::error::{Result, SdkError, require_non_empty};
use crate::keys::{SESSION_LOCK_FIELD, session_key};

/// Decoded lock value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// Worker that holds the lock.
    pub owner_id: String,
    /// Epoch milliseconds at acquisition.
    pub acquired_at_millis: i64,
}

impl LockRecord {
    pub fn new(owner_id: impl Into<String>, acquired_at_millis: i64) -> Self {
        Self {
            owner_id: owner_id.into(),
            acquired_at_millis,
        }
    }

    /// Parse a stored value. The owner is everything before the last `:`.
    pub fn parse(value: &str) -> Result<Self> {
        let (owner_id, millis) = value.rsplit_once(':').ok_or_else(|| {
            SdkError::MalformedResponse(format!("lock value without timestamp: {:?}", value))
        })?;
        let acquired_at_millis = millis.parse().map_err(|_| {
            SdkError::MalformedResponse(format!("lock value with bad timestamp: {:?}", value))
        })?;
        Ok(Self::new(owner_id, acquired_at_millis))
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

impl fmt::Display for LockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_id, self.acquired_at_millis)
    }
}

/// Lock operations over a [`KvBackend`].
#[derive(Clone)]
pub struct SessionLock {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
}

impl SessionLock {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Try to take the lock for `session`. Returns `false` if anyone holds it,
    /// including `owner_id` itself.
    #[instrument(skip(self))]
    pub async fn try_acquire(&self, session: &str, owner_id: &str) -> Result<bool> {
        require_non_empty("session key", session)?;
        require_non_empty("owner id", owner_id)?;

        let record = LockRecord::new(owner_id, self.clock.now_millis());
        let acquired = self
            .backend
            .cond_set_field(&session_key(session), SESSION_LOCK_FIELD, &record.to_string())
            .await?;

        if acquired {
            info!("Session lock acquired");
        } else {
            debug!("Session lock already held");
        }
        Ok(acquired)
    }

    /// Release the lock if `owner_id` holds it. Returns `false` and changes
    /// nothing when the lock is free or held by someone else.
    ///
    /// This is a read followed by a delete. If the lock changes hands between
    /// the two, the new holder's lock is removed.
    #[instrument(skip(self))]
    pub async fn release(&self, session: &str, owner_id: &str) -> Result<bool> {
        require_non_empty("session key", session)?;
        require_non_empty("owner id", owner_id)?;

        let key = session_key(session);
        let Some(value) = self.backend.get_field(&key, SESSION_LOCK_FIELD).await? else {
            debug!("No session lock to release");
            return Ok(false);
        };

        let record = LockRecord::parse(&value)?;
        if !record.is_owned_by(owner_id) {
            debug!(holder = %record.owner_id, "Session lock held by another worker");
            return Ok(false);
        }

        let released = self.backend.delete_field(&key, SESSION_LOCK_FIELD).await?;
        if released {
            info!("Session lock released");
        }
        Ok(released)
    }

    /// Current holder of the lock, if any.
    pub async fn holder(&self, session: &str) -> Result<Option<LockRecord>> {
        require_non_empty("session key", session)?;

        self.backend
            .get_field(&session_key(session), SESSION_LOCK_FIELD)
            .await?
            .map(|value| LockRecord::parse(&value))
            .transpose()
    }
}

impl fmt::Debug for SessionLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLock").finish_non_exhaustive()
    }
}
