// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversation history cache.
//!
//! Layout:
//! - `conversation:{id}` JSON [`Conversation`], messages included
//! - `message:{id}` JSON [`ConversationMessage`], for lookup by message id
//! - `conversations` set of every conversation id
//!
//! The store is authoritative. Each [`ConversationCache`] also keeps the
//! conversations it has created or loaded in process, so repeated reads skip
//! the round trip. Writes made by other processes to a conversation already
//! held here are not seen until it is deleted or the cache is cleared.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::backend::KvBackend;
use crate::clock::Clock;
use crate::error::{Result, SdkError, require_non_empty};
use crate::keys::{CONVERSATIONS_KEY, conversation_key, message_key};
use crate::types::{
    Conversation, ConversationMessage, ConversationStats, MessageMetadata, MessageRole,
};

#[derive(Debug, Default)]
struct Local {
    conversations: HashMap<String, Conversation>,
    /// Message id to conversation id.
    message_index: HashMap<String, String>,
}

impl Local {
    fn insert(&mut self, conversation: Conversation) {
        for message in &conversation.messages {
            self.message_index
                .insert(message.id.clone(), conversation.id.clone());
        }
        self.conversations
            .insert(conversation.id.clone(), conversation);
    }

    fn remove(&mut self, id: &str) {
        if let Some(conversation) = self.conversations.remove(id) {
            for message in &conversation.messages {
                self.message_index.remove(&message.id);
            }
        }
    }
}

/// Read-through, write-through cache of conversations over a [`KvBackend`].
///
/// Clones share the same in-process copy.
#[derive(Clone)]
pub struct ConversationCache {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    origin: String,
    next_seq: Arc<AtomicU64>,
    local: Arc<Mutex<Local>>,
}

impl ConversationCache {
    /// `origin` goes into generated message ids so that processes sharing a
    /// store never mint the same id.
    pub fn new(
        backend: Arc<dyn KvBackend>,
        clock: Arc<dyn Clock>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            clock,
            origin: origin.into(),
            next_seq: Arc::new(AtomicU64::new(0)),
            local: Arc::new(Mutex::new(Local::default())),
        }
    }

    fn now(&self) -> Result<DateTime<Utc>> {
        let millis = self.clock.now_millis();
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| SdkError::InvalidInput(format!("clock out of range: {}", millis)))
    }

    fn next_message_id(&self, at: DateTime<Utc>) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        format!("msg_{}_{}_{}", at.timestamp_millis(), self.origin, seq)
    }

    async fn store(&self, conversation: &Conversation) -> Result<()> {
        let raw = serde_json::to_string(conversation)?;
        self.backend
            .set_value(&conversation_key(&conversation.id), &raw)
            .await
    }

    async fn load(&self, id: &str) -> Result<Option<Conversation>> {
        let Some(raw) = self.backend.get_value(&conversation_key(id)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| SdkError::Serialization(format!("conversation {}: {}", id, e)))
    }

    /// Local copy, or the stored one which is then kept locally.
    async fn lookup(&self, local: &mut Local, id: &str) -> Result<Option<Conversation>> {
        if let Some(conversation) = local.conversations.get(id) {
            return Ok(Some(conversation.clone()));
        }
        let loaded = self.load(id).await?;
        if let Some(conversation) = &loaded {
            local.insert(conversation.clone());
        }
        Ok(loaded)
    }

    /// Start an empty conversation, replacing any existing one with that id.
    #[instrument(skip(self))]
    pub async fn create_conversation(
        &self,
        id: &str,
        title: Option<&str>,
    ) -> Result<Conversation> {
        require_non_empty("conversation id", id)?;

        let now = self.now()?;
        let conversation = Conversation {
            id: id.to_string(),
            title: title.map(str::to_string),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut local = self.local.lock().await;
        self.store(&conversation).await?;
        self.backend
            .set_add(CONVERSATIONS_KEY, &[id.to_string()])
            .await?;
        local.remove(id);
        local.insert(conversation.clone());

        info!("Conversation created");
        Ok(conversation)
    }

    /// Append a message. Fails with [`SdkError::NotFound`] if the
    /// conversation does not exist.
    #[instrument(skip(self, content, metadata))]
    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        metadata: Option<MessageMetadata>,
    ) -> Result<ConversationMessage> {
        require_non_empty("conversation id", conversation_id)?;

        let mut local = self.local.lock().await;
        let Some(mut conversation) = self.lookup(&mut local, conversation_id).await? else {
            return Err(SdkError::NotFound(format!(
                "conversation {}",
                conversation_id
            )));
        };

        let now = self.now()?;
        let message = ConversationMessage {
            id: self.next_message_id(now),
            role,
            content: content.to_string(),
            timestamp: now,
            metadata,
        };
        conversation.messages.push(message.clone());
        conversation.updated_at = now;

        self.store(&conversation).await?;
        self.backend
            .set_value(&message_key(&message.id), &serde_json::to_string(&message)?)
            .await?;
        local.insert(conversation);

        debug!(message_id = %message.id, "Message added");
        Ok(message)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        require_non_empty("conversation id", id)?;
        let mut local = self.local.lock().await;
        self.lookup(&mut local, id).await
    }

    /// Every conversation listed in the store, ordered by id.
    pub async fn get_all_conversations(&self) -> Result<Vec<Conversation>> {
        let ids = self.backend.set_members(CONVERSATIONS_KEY).await?;
        let mut local = self.local.lock().await;
        let mut conversations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(conversation) = self.lookup(&mut local, &id).await? {
                conversations.push(conversation);
            }
        }
        Ok(conversations)
    }

    /// Messages oldest first; empty for an unknown conversation.
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>> {
        Ok(self
            .get_conversation(conversation_id)
            .await?
            .map(|c| c.messages)
            .unwrap_or_default())
    }

    pub async fn get_last_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationMessage>> {
        Ok(self.get_messages(conversation_id).await?.pop())
    }

    /// Look a message up by id, in the store first and then in the
    /// conversations held locally.
    pub async fn get_message(&self, message_id: &str) -> Result<Option<ConversationMessage>> {
        require_non_empty("message id", message_id)?;

        if let Some(raw) = self.backend.get_value(&message_key(message_id)).await? {
            return serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SdkError::Serialization(format!("message {}: {}", message_id, e)));
        }

        let local = self.local.lock().await;
        Ok(local
            .message_index
            .get(message_id)
            .and_then(|conversation_id| local.conversations.get(conversation_id))
            .and_then(|c| c.messages.iter().find(|m| m.id == message_id))
            .cloned())
    }

    /// Delete a conversation and its messages. Returns `false` if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete_conversation(&self, id: &str) -> Result<bool> {
        require_non_empty("conversation id", id)?;

        let mut local = self.local.lock().await;
        let Some(conversation) = self.lookup(&mut local, id).await? else {
            return Ok(false);
        };

        let keys: Vec<String> = std::iter::once(conversation_key(id))
            .chain(conversation.messages.iter().map(|m| message_key(&m.id)))
            .collect();
        self.backend.delete_keys(&keys).await?;
        self.backend
            .set_remove(CONVERSATIONS_KEY, &[id.to_string()])
            .await?;
        local.remove(id);

        info!(messages = conversation.messages.len(), "Conversation deleted");
        Ok(true)
    }

    /// Delete every conversation in the store and drop the local copy.
    /// Returns how many conversations were deleted.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        let ids = self.backend.set_members(CONVERSATIONS_KEY).await?;
        let mut deleted = 0;
        for id in &ids {
            if self.delete_conversation(id).await? {
                deleted += 1;
            }
        }

        let mut local = self.local.lock().await;
        local.conversations.clear();
        local.message_index.clear();

        info!(deleted, "Conversation cache cleared");
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<ConversationStats> {
        let conversations = self.get_all_conversations().await?;
        let total_conversations = conversations.len() as u64;
        let total_messages: u64 = conversations.iter().map(|c| c.messages.len() as u64).sum();
        let average_messages_per_conversation = if total_conversations > 0 {
            total_messages as f64 / total_conversations as f64
        } else {
            0.0
        };
        Ok(ConversationStats {
            total_conversations,
            total_messages,
            average_messages_per_conversation,
        })
    }
}

impl fmt::Debug for ConversationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationCache")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
