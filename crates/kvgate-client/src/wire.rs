// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decoding of gateway response bodies.
//!
//! The gateway answers either with the bare value or with a `{"result": ...}`
//! envelope. Range endpoints may also wrap their list in `{"members": ...}`.
//! Anything else is reported as [`ClientError::UnexpectedResponse`] instead of
//! being coerced to an empty value.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::types::{ScanPage, ScoredMember};

/// Strip the `{"result": ...}` envelope if present.
pub(crate) fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn unexpected(expected: &str, got: &Value) -> ClientError {
    let full = got.to_string();
    let mut shown: String = full.chars().take(120).collect();
    if shown.len() < full.len() {
        shown.push_str("...");
    }
    ClientError::UnexpectedResponse(format!("expected {}, got {}", expected, shown))
}

pub(crate) fn decode_bool(body: Value) -> Result<bool> {
    match unwrap_envelope(body) {
        Value::Bool(b) => Ok(b),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        other => Err(unexpected("boolean or 0/1", &other)),
    }
}

pub(crate) fn decode_u64(body: Value) -> Result<u64> {
    let value = unwrap_envelope(body);
    value.as_u64().ok_or_else(|| unexpected("non-negative integer", &value))
}

/// Signed integer, e.g. a counter or a TTL that may be `-1`/`-2`.
pub(crate) fn decode_i64(body: Value) -> Result<i64> {
    let value = unwrap_envelope(body);
    match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| unexpected("integer", &value))
}

pub(crate) fn decode_optional_string(body: Value) -> Result<Option<String>> {
    match unwrap_envelope(body) {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(unexpected("string or null", &other)),
    }
}

pub(crate) fn decode_string(body: Value) -> Result<String> {
    match unwrap_envelope(body) {
        Value::String(s) => Ok(s),
        other => Err(unexpected("string", &other)),
    }
}

/// Hash contents. A missing key comes back as `null` or `{}`.
pub(crate) fn decode_string_map(body: Value) -> Result<HashMap<String, String>> {
    match unwrap_envelope(body) {
        Value::Null => Ok(HashMap::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(field, value)| match value {
                Value::String(s) => Ok((field, s)),
                Value::Number(n) => Ok((field, n.to_string())),
                Value::Bool(b) => Ok((field, b.to_string())),
                other => Err(unexpected("string field value", &other)),
            })
            .collect(),
        other => Err(unexpected("object of fields", &other)),
    }
}

/// Strip a single-purpose object such as `{"ttl_in_seconds": 60}` down to its field.
pub(crate) fn unwrap_field(value: Value, field: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(field) => {
            map.remove(field).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn unwrap_members(value: Value) -> Value {
    unwrap_field(value, "members")
}

pub(crate) fn decode_string_list(body: Value) -> Result<Vec<String>> {
    match unwrap_members(unwrap_envelope(body)) {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(unexpected("string list item", &other)),
            })
            .collect(),
        other => Err(unexpected("array", &other)),
    }
}

/// Member names of a sorted-set range; scored objects are reduced to their member.
pub(crate) fn decode_members(body: Value) -> Result<Vec<String>> {
    match unwrap_members(unwrap_envelope(body)) {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Object(ref map) => match map.get("member") {
                    Some(Value::String(s)) => Ok(s.clone()),
                    _ => Err(unexpected("object with string member", &item)),
                },
                other => Err(unexpected("member name", &other)),
            })
            .collect(),
        other => Err(unexpected("array", &other)),
    }
}

fn parse_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "inf" | "+inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

/// Members with scores. Accepts `[{member, score}, ...]` or the flat
/// `[member, score, member, score, ...]` layout of raw WITHSCORES replies.
pub(crate) fn decode_scored(body: Value) -> Result<Vec<ScoredMember>> {
    let items = match unwrap_members(unwrap_envelope(body)) {
        Value::Array(items) => items,
        other => return Err(unexpected("array", &other)),
    };

    if items.iter().all(Value::is_object) {
        return items
            .into_iter()
            .map(|item| {
                let member = item.get("member").and_then(Value::as_str);
                let score = item.get("score").and_then(parse_score);
                match (member, score) {
                    (Some(member), Some(score)) => Ok(ScoredMember::new(member, score)),
                    _ => Err(unexpected("object with member and score", &item)),
                }
            })
            .collect();
    }

    if items.len() % 2 != 0 {
        return Err(unexpected(
            "even-length member/score array",
            &Value::Array(items),
        ));
    }

    items
        .chunks(2)
        .map(|pair| match (&pair[0], parse_score(&pair[1])) {
            (Value::String(member), Some(score)) => Ok(ScoredMember::new(member.clone(), score)),
            _ => Err(unexpected("member followed by score", &Value::Array(pair.to_vec()))),
        })
        .collect()
}

/// `keys/scan` answers either `[cursor, [keys]]`, `{cursor, keys}` or just the keys.
pub(crate) fn decode_scan(body: Value) -> Result<ScanPage> {
    match unwrap_envelope(body) {
        Value::Array(items)
            if items.len() == 2 && items[1].is_array() && !items[0].is_array() =>
        {
            let mut iter = items.into_iter();
            let cursor = iter.next().unwrap_or(Value::Null);
            let keys = iter.next().unwrap_or(Value::Null);
            Ok(ScanPage {
                cursor: match cursor {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    other => return Err(unexpected("scan cursor", &other)),
                },
                keys: decode_string_list(keys)?,
            })
        }
        Value::Array(items) => Ok(ScanPage {
            cursor: "0".to_string(),
            keys: decode_string_list(Value::Array(items))?,
        }),
        Value::Object(mut map) if map.contains_key("keys") => {
            let cursor = match map.remove("cursor") {
                Some(Value::String(s)) => s,
                Some(Value::Number(n)) => n.to_string(),
                None | Some(Value::Null) => "0".to_string(),
                Some(other) => return Err(unexpected("scan cursor", &other)),
            };
            let keys = decode_string_list(map.remove("keys").unwrap_or(Value::Null))?;
            Ok(ScanPage { cursor, keys })
        }
        other => Err(unexpected("scan page", &other)),
    }
}
