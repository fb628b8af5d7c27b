// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! GatewayClient for talking to the key-value gateway over HTTP.

use std::collections::HashMap;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::pipeline::Pipeline;
use crate::types::{ExecMode, ListEnd, ScanPage, ScoreBound, ScoredMember};
use crate::wire;

/// Upper bound on `keys/scan` round trips in [`Keys::scan_all`].
const MAX_SCAN_PAGES: usize = 10_000;

/// HTTP client for the key-value gateway.
///
/// Every method is a single request. Operations are grouped the same way the
/// gateway groups its routes: [`keys`](Self::keys), [`hashes`](Self::hashes),
/// [`lists`](Self::lists), [`sets`](Self::sets) and
/// [`sorted_sets`](Self::sorted_sets). Batches go through
/// [`pipeline`](Self::pipeline).
///
/// Credentials are fixed at construction. To talk to the gateway with another
/// token, build another client.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: ClientConfig,
    api_root: String,
}

impl GatewayClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| ClientError::Config(format!("invalid api key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {}", e)))?;

        let api_root = config.api_root();
        Ok(Self {
            http,
            config,
            api_root,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client for localhost development.
    pub fn localhost() -> Result<Self> {
        Self::new(ClientConfig::localhost())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn map_send_error(&self, route: &str, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.config.request_timeout.as_millis() as u64)
        } else if err.is_connect() || err.is_request() {
            ClientError::Connection(format!("{} failed: {}", route, err))
        } else {
            ClientError::from(err)
        }
    }

    async fn read_response(&self, route: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(route, e))?;

        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            ClientError::UnexpectedResponse(format!("invalid JSON from {}: {}", route, e))
        })
    }

    /// POST a JSON body to an API route and return the decoded JSON response.
    #[instrument(skip(self, body), fields(route = %route))]
    pub async fn post<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> Result<Value> {
        let url = format!("{}{}", self.api_root, route);
        debug!("Gateway request");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(route, e))?;

        self.read_response(route, response).await
    }

    /// GET an API route.
    #[instrument(skip(self), fields(route = %route))]
    pub async fn get(&self, route: &str) -> Result<Value> {
        let url = format!("{}{}", self.api_root, route);
        debug!("Gateway request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(route, e))?;

        self.read_response(route, response).await
    }

    // =========================================================================
    // Route groups
    // =========================================================================

    /// Check gateway health.
    pub async fn health(&self) -> Result<Value> {
        self.get("/health").await
    }

    /// Key-level operations.
    pub fn keys(&self) -> Keys<'_> {
        Keys { client: self }
    }

    /// Hash operations.
    pub fn hashes(&self) -> Hashes<'_> {
        Hashes { client: self }
    }

    /// List operations.
    pub fn lists(&self) -> Lists<'_> {
        Lists { client: self }
    }

    /// Set operations.
    pub fn sets(&self) -> Sets<'_> {
        Sets { client: self }
    }

    /// Sorted-set operations.
    pub fn sorted_sets(&self) -> SortedSets<'_> {
        SortedSets { client: self }
    }

    /// Start a batch of commands.
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self)
    }
}

/// Pull a readable message out of an error body.
fn error_message(text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        for field in ["message", "error"] {
            if let Some(Value::String(message)) = map.get(field) {
                return message.clone();
            }
        }
    }
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text.chars().take(200).collect()
    }
}

fn str_list<S: AsRef<str>>(items: &[S]) -> Vec<&str> {
    items.iter().map(AsRef::as_ref).collect()
}

// =============================================================================
// Keys
// =============================================================================

/// Key-level operations.
pub struct Keys<'a> {
    client: &'a GatewayClient,
}

impl Keys<'_> {
    /// Count how many of the given keys exist.
    pub async fn exists<S: AsRef<str>>(&self, keys: &[S]) -> Result<u64> {
        let body = self
            .client
            .post("/keys/exists", &json!({ "keys": str_list(keys) }))
            .await?;
        wire::decode_u64(body)
    }

    /// Read a string value. `None` when the key is missing.
    ///
    /// Structured values come back as their JSON text.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let body = match self.client.post("/keys/get", &json!({ "key": key })).await {
            Ok(body) => body,
            Err(ClientError::Server { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        match wire::unwrap_field(wire::unwrap_envelope(body), "value") {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Write a string value, optionally expiring after `ex_seconds`.
    pub async fn set(&self, key: &str, value: &str, ex_seconds: Option<u64>) -> Result<()> {
        let mut body = json!({ "key": key, "value": value });
        if let Some(seconds) = ex_seconds {
            body["ex"] = json!(seconds);
        }
        self.client.post("/keys/set", &body).await?;
        Ok(())
    }

    /// Delete keys of any type; returns how many existed.
    pub async fn del<S: AsRef<str>>(&self, keys: &[S]) -> Result<u64> {
        let body = self
            .client
            .post("/keys/del", &json!({ "keys": str_list(keys) }))
            .await?;
        wire::decode_u64(wire::unwrap_field(wire::unwrap_envelope(body), "deletedCount"))
    }

    /// Increment an integer value by one and return the result.
    pub async fn incr(&self, key: &str) -> Result<i64> {
        let body = self.client.post("/keys/incr", &json!({ "key": key })).await?;
        wire::decode_i64(wire::unwrap_field(wire::unwrap_envelope(body), "value"))
    }

    /// Expire a key after `seconds`.
    pub async fn expire(&self, key: &str, seconds: u64) -> Result<()> {
        self.client
            .post("/keys/expire", &json!({ "key": key, "seconds": seconds }))
            .await?;
        Ok(())
    }

    /// Remaining time to live in seconds: `-1` without expiry, `-2` when missing.
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let body = self.client.post("/keys/ttl", &json!({ "key": key })).await?;
        wire::decode_i64(wire::unwrap_field(wire::unwrap_envelope(body), "ttl_in_seconds"))
    }

    /// Rename a key.
    pub async fn rename(&self, key: &str, new_key: &str) -> Result<()> {
        self.client
            .post("/keys/rename", &json!({ "key": key, "newKey": new_key }))
            .await?;
        Ok(())
    }

    /// Data type stored at a key (`string`, `hash`, `none`, ...).
    pub async fn key_type(&self, key: &str) -> Result<String> {
        let body = self
            .client
            .post("/keys/getType", &json!({ "key": key }))
            .await?;
        wire::decode_string(body)
    }

    /// Fetch one page of keys matching a glob pattern.
    pub async fn scan(&self, cursor: &str, pattern: &str, count: u32) -> Result<ScanPage> {
        let body = self
            .client
            .post(
                "/keys/scan",
                &json!({ "cursor": cursor, "match": pattern, "count": count }),
            )
            .await?;
        wire::decode_scan(body)
    }

    /// Collect every key matching a glob pattern.
    pub async fn scan_all(&self, pattern: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = "0".to_string();
        for _ in 0..MAX_SCAN_PAGES {
            let page = self.scan(&cursor, pattern, 1000).await?;
            keys.extend(page.keys);
            if page.cursor == "0" {
                keys.sort();
                keys.dedup();
                return Ok(keys);
            }
            cursor = page.cursor;
        }
        Err(ClientError::UnexpectedResponse(format!(
            "scan for {} did not finish after {} pages",
            pattern, MAX_SCAN_PAGES
        )))
    }
}

// =============================================================================
// Hashes
// =============================================================================

/// Hash operations.
pub struct Hashes<'a> {
    client: &'a GatewayClient,
}

impl Hashes<'_> {
    /// Read one field. `None` when the field or the hash is missing.
    pub async fn get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let body = self
            .client
            .post("/hashes/hget", &json!({ "key": key, "field": field }))
            .await?;
        wire::decode_optional_string(body)
    }

    /// Read every field of a hash. A missing hash is an empty map.
    pub async fn get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let body = self
            .client
            .post("/hashes/hgetall", &json!({ "key": key }))
            .await?;
        wire::decode_string_map(body)
    }

    /// Write one field, overwriting any previous value.
    pub async fn set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.client
            .post(
                "/hashes/hset",
                &json!({ "key": key, "field": field, "value": value }),
            )
            .await?;
        Ok(())
    }

    /// Write one field only if it does not exist yet.
    ///
    /// Returns `true` when this call created the field. The gateway applies the
    /// check and the write atomically.
    pub async fn set_if_absent(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let body = self
            .client
            .post(
                "/hashes/hsetnx",
                &json!({ "key": key, "field": field, "value": value }),
            )
            .await?;
        wire::decode_bool(body)
    }

    /// Delete one field. Returns `true` if it existed.
    pub async fn delete(&self, key: &str, field: &str) -> Result<bool> {
        let body = self
            .client
            .post("/hashes/hdel", &json!({ "key": key, "field": field }))
            .await?;
        wire::decode_u64(body).map(|removed| removed > 0)
    }

    /// Delete several fields in one round trip. Returns how many existed.
    pub async fn delete_many<S: AsRef<str>>(&self, key: &str, fields: &[S]) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let replies = self
            .client
            .pipeline()
            .hdel(key, &str_list(fields))
            .execute(ExecMode::Pipeline)
            .await?;
        let reply = replies.into_iter().next().unwrap_or(Value::Null);
        wire::decode_u64(reply)
    }
}

// =============================================================================
// Lists
// =============================================================================

/// List operations.
pub struct Lists<'a> {
    client: &'a GatewayClient,
}

impl Lists<'_> {
    /// Push values at either end; returns the new list length.
    pub async fn push<S: AsRef<str>>(&self, key: &str, values: &[S], end: ListEnd) -> Result<u64> {
        let route = match end {
            ListEnd::Left => "/lists/lpush",
            ListEnd::Right => "/lists/rpush",
        };
        let body = self
            .client
            .post(route, &json!({ "key": key, "values": str_list(values) }))
            .await?;
        wire::decode_u64(body)
    }

    pub async fn push_left<S: AsRef<str>>(&self, key: &str, values: &[S]) -> Result<u64> {
        self.push(key, values, ListEnd::Left).await
    }

    pub async fn push_right<S: AsRef<str>>(&self, key: &str, values: &[S]) -> Result<u64> {
        self.push(key, values, ListEnd::Right).await
    }

    /// Elements between `start` and `stop` inclusive; negative indexes count from the end.
    pub async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let body = self
            .client
            .post(
                "/lists/lrange",
                &json!({ "key": key, "start": start, "stop": stop }),
            )
            .await?;
        wire::decode_string_list(body)
    }

    pub async fn len(&self, key: &str) -> Result<u64> {
        let body = self
            .client
            .post("/lists/llen", &json!({ "key": key }))
            .await?;
        wire::decode_u64(body)
    }

    /// Keep only the elements between `start` and `stop` inclusive.
    pub async fn trim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        self.client
            .post(
                "/lists/ltrim",
                &json!({ "key": key, "start": start, "stop": stop }),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// Sets
// =============================================================================

/// Set operations.
pub struct Sets<'a> {
    client: &'a GatewayClient,
}

impl Sets<'_> {
    /// Add members; returns how many were new.
    pub async fn add<S: AsRef<str>>(&self, key: &str, members: &[S]) -> Result<u64> {
        let body = self
            .client
            .post("/sets/sadd", &json!({ "key": key, "members": str_list(members) }))
            .await?;
        wire::decode_u64(body)
    }

    pub async fn members(&self, key: &str) -> Result<Vec<String>> {
        let body = self
            .client
            .post("/sets/smembers", &json!({ "key": key }))
            .await?;
        wire::decode_string_list(body)
    }

    /// Remove members; returns how many were present.
    pub async fn remove<S: AsRef<str>>(&self, key: &str, members: &[S]) -> Result<u64> {
        let body = self
            .client
            .post("/sets/srem", &json!({ "key": key, "members": str_list(members) }))
            .await?;
        wire::decode_u64(body)
    }

    pub async fn count(&self, key: &str) -> Result<u64> {
        let body = self
            .client
            .post("/sets/scard", &json!({ "key": key }))
            .await?;
        wire::decode_u64(body)
    }
}

// =============================================================================
// Sorted sets
// =============================================================================

/// Sorted-set operations.
pub struct SortedSets<'a> {
    client: &'a GatewayClient,
}

impl SortedSets<'_> {
    /// Add members or update their scores; returns how many were new.
    pub async fn add(&self, key: &str, members: &[ScoredMember]) -> Result<u64> {
        let body = self
            .client
            .post("/sortedSets/zadd", &json!({ "key": key, "members": members }))
            .await?;
        wire::decode_u64(body)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64, with_scores: bool) -> Result<Value> {
        self.client
            .post(
                "/sortedSets/zrange",
                &json!({ "key": key, "start": start, "stop": stop, "withScores": with_scores }),
            )
            .await
    }

    /// Members by rank, lowest score first.
    pub async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        wire::decode_members(self.zrange(key, start, stop, false).await?)
    }

    /// Members with scores by rank, lowest score first.
    pub async fn range_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<ScoredMember>> {
        wire::decode_scored(self.zrange(key, start, stop, true).await?)
    }

    async fn zrangebyscore(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        with_scores: bool,
    ) -> Result<Value> {
        self.client
            .post(
                "/sortedSets/zrangebyscore",
                &json!({
                    "key": key,
                    "min": min,
                    "max": max,
                    "withScores": with_scores,
                    "reverse": false,
                }),
            )
            .await
    }

    /// Members whose score lies in `[min, max]`, ascending by score.
    pub async fn range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>> {
        wire::decode_members(self.zrangebyscore(key, min, max, false).await?)
    }

    /// Members with scores in `[min, max]`, ascending by score.
    pub async fn range_by_score_with_scores(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<ScoredMember>> {
        wire::decode_scored(self.zrangebyscore(key, min, max, true).await?)
    }

    /// Remove members; returns how many were present.
    pub async fn remove<S: AsRef<str>>(&self, key: &str, members: &[S]) -> Result<u64> {
        let body = self
            .client
            .post(
                "/sortedSets/zrem",
                &json!({ "key": key, "members": str_list(members) }),
            )
            .await?;
        wire::decode_u64(body)
    }

    pub async fn cardinality(&self, key: &str) -> Result<u64> {
        let body = self
            .client
            .post("/sortedSets/zcard", &json!({ "key": key }))
            .await?;
        wire::decode_u64(body)
    }
}
