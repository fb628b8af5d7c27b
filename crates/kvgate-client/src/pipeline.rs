// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command batching.
//!
//! A [`Pipeline`] collects commands locally and sends them in a single request,
//! either as a plain pipeline or as a MULTI/EXEC transaction:
//!
//! ```no_run
//! use kvgate_client::{ExecMode, GatewayClient, ScoredMember};
//!
//! # async fn example() -> kvgate_client::Result<()> {
//! let client = GatewayClient::localhost()?;
//! let replies = client
//!     .pipeline()
//!     .hset("user:1", &[("name", "Ana"), ("plan", "pro")])
//!     .sadd("users", &["user:1"])
//!     .zadd("logins", &[ScoredMember::new("user:1", 1_700_000_000.0)])
//!     .execute(ExecMode::Transaction)
//!     .await?;
//! assert_eq!(replies.len(), 3);
//! # Ok(())
//! # }
//! ```

use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::client::GatewayClient;
use crate::error::{ClientError, Result};
use crate::types::{Command, ExecMode, ScoredMember};
use crate::wire;

/// Builder for a batch of commands.
pub struct Pipeline<'a> {
    client: &'a GatewayClient,
    commands: Vec<Command>,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(client: &'a GatewayClient) -> Self {
        Self {
            client,
            commands: Vec::new(),
        }
    }

    /// Queue an arbitrary command.
    pub fn command(mut self, name: &str, args: Vec<Value>) -> Self {
        self.commands.push(Command::new(name, args));
        self
    }

    fn with_key(self, name: &str, key: &str, rest: impl IntoIterator<Item = Value>) -> Self {
        let mut args = vec![json!(key)];
        args.extend(rest);
        self.command(name, args)
    }

    /// Commands queued so far.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    // Keys & strings

    pub fn get(self, key: &str) -> Self {
        self.with_key("get", key, [])
    }

    /// Store a JSON-encoded value, optionally expiring after `ex_seconds`.
    pub fn set(self, key: &str, value: &Value, ex_seconds: Option<u64>) -> Self {
        let encoded = value.to_string();
        match ex_seconds {
            Some(seconds) => self.with_key("set", key, [json!(encoded), json!("EX"), json!(seconds)]),
            None => self.with_key("set", key, [json!(encoded)]),
        }
    }

    pub fn incr(self, key: &str) -> Self {
        self.with_key("incr", key, [])
    }

    pub fn del(self, keys: &[&str]) -> Self {
        self.command("del", keys.iter().map(|k| json!(k)).collect())
    }

    pub fn expire(self, key: &str, seconds: u64) -> Self {
        self.with_key("expire", key, [json!(seconds)])
    }

    // Hashes

    pub fn hgetall(self, key: &str) -> Self {
        self.with_key("hgetall", key, [])
    }

    pub fn hdel(self, key: &str, fields: &[&str]) -> Self {
        self.with_key("hdel", key, fields.iter().map(|f| json!(f)))
    }

    pub fn hset(self, key: &str, fields: &[(&str, &str)]) -> Self {
        let args = fields
            .iter()
            .flat_map(|(field, value)| [json!(field), json!(value)]);
        self.with_key("hset", key, args)
    }

    // Lists

    pub fn lpush(self, key: &str, values: &[&str]) -> Self {
        self.with_key("lpush", key, values.iter().map(|v| json!(v)))
    }

    pub fn rpush(self, key: &str, values: &[&str]) -> Self {
        self.with_key("rpush", key, values.iter().map(|v| json!(v)))
    }

    pub fn lrange(self, key: &str, start: i64, stop: i64) -> Self {
        self.with_key("lrange", key, [json!(start), json!(stop)])
    }

    // Sets

    pub fn sadd(self, key: &str, members: &[&str]) -> Self {
        self.with_key("sadd", key, members.iter().map(|m| json!(m)))
    }

    pub fn srem(self, key: &str, members: &[&str]) -> Self {
        self.with_key("srem", key, members.iter().map(|m| json!(m)))
    }

    pub fn smembers(self, key: &str) -> Self {
        self.with_key("smembers", key, [])
    }

    // Sorted sets

    pub fn zadd(self, key: &str, members: &[ScoredMember]) -> Self {
        let args = members
            .iter()
            .flat_map(|m| [json!(m.score), json!(m.member)]);
        self.with_key("zadd", key, args)
    }

    pub fn zrange(self, key: &str, start: i64, stop: i64) -> Self {
        self.with_key("zrange", key, [json!(start), json!(stop)])
    }

    pub fn zrem(self, key: &str, members: &[&str]) -> Self {
        self.with_key("zrem", key, members.iter().map(|m| json!(m)))
    }

    /// Send the queued commands and return one reply per command, in order.
    #[instrument(skip(self, mode), fields(commands = self.commands.len(), mode = mode.as_str()))]
    pub async fn execute(self, mode: ExecMode) -> Result<Vec<Value>> {
        if self.commands.is_empty() {
            return Err(ClientError::InvalidInput(
                "pipeline has no commands".to_string(),
            ));
        }

        let expected = self.commands.len();
        let body = self
            .client
            .post(mode.route(), &json!({ "commands": self.commands }))
            .await?;

        let replies = match wire::unwrap_envelope(body) {
            Value::Array(replies) => replies,
            other => {
                return Err(ClientError::UnexpectedResponse(format!(
                    "expected array of {} replies, got {}",
                    expected, other
                )));
            }
        };

        if replies.len() != expected {
            return Err(ClientError::UnexpectedResponse(format!(
                "expected {} replies, got {}",
                expected,
                replies.len()
            )));
        }

        debug!("Batch executed");
        Ok(replies)
    }
}
