// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Key layout shared with other services using the same store.
//!
//! These names are part of the on-store contract and must not change.

/// Hash field holding a session's lock record.
pub const SESSION_LOCK_FIELD: &str = "sessionLock";

/// Hash field stamped by every session update.
pub const SESSION_UPDATED_AT_FIELD: &str = "updatedAt";

/// Hash of flow name to JSON-encoded flow configuration.
pub const FLOWS_KEY: &str = "neurohive:flows";

/// Glob matching every session hash.
pub const SESSION_PATTERN: &str = "session:phone:*";

/// Glob matching every cache hash.
pub const CACHE_PATTERN: &str = "cache:*";

pub fn session_key(phone: &str) -> String {
    format!("session:phone:{}", phone)
}

/// Sorted set of worker id to last-seen epoch seconds.
pub fn health_key(group: &str) -> String {
    format!("agent:health:{}", group)
}

/// Hash of worker id to its declared time-to-live in seconds.
///
/// Lives outside the `agent:health:` prefix so no group name can produce it.
pub fn health_ttl_key(group: &str) -> String {
    format!("agent:health-ttl:{}", group)
}

pub fn ai_context_key(phone: &str) -> String {
    format!("context:ai:{}", phone)
}

pub fn cache_key(name: &str) -> String {
    format!("cache:{}", name)
}

/// Set of every conversation id held by the conversation cache.
pub const CONVERSATIONS_KEY: &str = "conversations";

pub fn conversation_key(id: &str) -> String {
    format!("conversation:{}", id)
}

pub fn message_key(id: &str) -> String {
    format!("message:{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(session_key("5511999"), "session:phone:5511999");
        assert_eq!(health_key("agents"), "agent:health:agents");
        assert_eq!(health_ttl_key("agents"), "agent:health-ttl:agents");
        assert_eq!(ai_context_key("5511999"), "context:ai:5511999");
        assert_eq!(cache_key("products"), "cache:products");
        assert_eq!(conversation_key("c1"), "conversation:c1");
        assert_eq!(message_key("msg_1_0"), "message:msg_1_0");
    }

    #[test]
    fn test_ttl_hash_is_not_a_health_key() {
        for group in ["g", "g:ttl", "agents", "health-ttl:g"] {
            assert!(!health_ttl_key(group).starts_with("agent:health:"));
        }
        assert_ne!(health_key("g:ttl"), health_ttl_key("g"));
        assert_ne!(health_key("health-ttl:g"), health_ttl_key("g"));
    }
}
