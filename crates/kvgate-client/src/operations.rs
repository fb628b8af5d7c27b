// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Named gateway operations and workflow execution.
//!
//! Every operation the client exposes has a stable dotted name (`hashes.get`,
//! `sets.add`, ...). Workflows are lists of `{function, params}` steps that
//! refer to operations by name; names are resolved to [`Operation`] up front so
//! an unknown name fails before any request is sent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::client::GatewayClient;
use crate::error::{ClientError, Result};
use crate::types::{Command, ExecMode, ScoredMember};

/// A gateway operation addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Health,
    KeysGet,
    KeysSet,
    KeysDel,
    KeysIncr,
    KeysExpire,
    KeysTtl,
    KeysExists,
    KeysRename,
    KeysType,
    HashesGet,
    HashesGetAll,
    HashesSet,
    HashesSetIfAbsent,
    HashesDel,
    ListsPushLeft,
    ListsPushRight,
    ListsGetRange,
    ListsLength,
    SetsAdd,
    SetsGetMembers,
    SetsRemove,
    SetsCount,
    SortedSetsAdd,
    SortedSetsGetRange,
    SortedSetsRemove,
    SortedSetsCount,
    PipelineExec,
    TransactionExec,
}

impl Operation {
    /// Every operation, in display order.
    pub const ALL: [Operation; 29] = [
        Operation::Health,
        Operation::KeysGet,
        Operation::KeysSet,
        Operation::KeysDel,
        Operation::KeysIncr,
        Operation::KeysExpire,
        Operation::KeysTtl,
        Operation::KeysExists,
        Operation::KeysRename,
        Operation::KeysType,
        Operation::HashesGet,
        Operation::HashesGetAll,
        Operation::HashesSet,
        Operation::HashesSetIfAbsent,
        Operation::HashesDel,
        Operation::ListsPushLeft,
        Operation::ListsPushRight,
        Operation::ListsGetRange,
        Operation::ListsLength,
        Operation::SetsAdd,
        Operation::SetsGetMembers,
        Operation::SetsRemove,
        Operation::SetsCount,
        Operation::SortedSetsAdd,
        Operation::SortedSetsGetRange,
        Operation::SortedSetsRemove,
        Operation::SortedSetsCount,
        Operation::PipelineExec,
        Operation::TransactionExec,
    ];

    /// Dotted name used in workflows.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::KeysGet => "keys.get",
            Self::KeysSet => "keys.set",
            Self::KeysDel => "keys.del",
            Self::KeysIncr => "keys.incr",
            Self::KeysExpire => "keys.expire",
            Self::KeysTtl => "keys.ttl",
            Self::KeysExists => "keys.exists",
            Self::KeysRename => "keys.rename",
            Self::KeysType => "keys.type",
            Self::HashesGet => "hashes.get",
            Self::HashesGetAll => "hashes.getAll",
            Self::HashesSet => "hashes.set",
            Self::HashesSetIfAbsent => "hashes.setIfAbsent",
            Self::HashesDel => "hashes.del",
            Self::ListsPushLeft => "lists.pushLeft",
            Self::ListsPushRight => "lists.pushRight",
            Self::ListsGetRange => "lists.getRange",
            Self::ListsLength => "lists.length",
            Self::SetsAdd => "sets.add",
            Self::SetsGetMembers => "sets.getMembers",
            Self::SetsRemove => "sets.remove",
            Self::SetsCount => "sets.count",
            Self::SortedSetsAdd => "sortedSets.add",
            Self::SortedSetsGetRange => "sortedSets.getRange",
            Self::SortedSetsRemove => "sortedSets.remove",
            Self::SortedSetsCount => "sortedSets.count",
            Self::PipelineExec => "pipelining.exec",
            Self::TransactionExec => "transactions.exec",
        }
    }

    /// HTTP method and route on the gateway.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Health => "GET /health",
            Self::KeysGet => "POST /keys/get",
            Self::KeysSet => "POST /keys/set",
            Self::KeysDel => "POST /keys/del",
            Self::KeysIncr => "POST /keys/incr",
            Self::KeysExpire => "POST /keys/expire",
            Self::KeysTtl => "POST /keys/ttl",
            Self::KeysExists => "POST /keys/exists",
            Self::KeysRename => "POST /keys/rename",
            Self::KeysType => "POST /keys/getType",
            Self::HashesGet => "POST /hashes/hget",
            Self::HashesGetAll => "POST /hashes/hgetall",
            Self::HashesSet => "POST /hashes/hset",
            Self::HashesSetIfAbsent => "POST /hashes/hsetnx",
            Self::HashesDel => "POST /hashes/hdel",
            Self::ListsPushLeft => "POST /lists/lpush",
            Self::ListsPushRight => "POST /lists/rpush",
            Self::ListsGetRange => "POST /lists/lrange",
            Self::ListsLength => "POST /lists/llen",
            Self::SetsAdd => "POST /sets/sadd",
            Self::SetsGetMembers => "POST /sets/smembers",
            Self::SetsRemove => "POST /sets/srem",
            Self::SetsCount => "POST /sets/scard",
            Self::SortedSetsAdd => "POST /sortedSets/zadd",
            Self::SortedSetsGetRange => "POST /sortedSets/zrange",
            Self::SortedSetsRemove => "POST /sortedSets/zrem",
            Self::SortedSetsCount => "POST /sortedSets/zcard",
            Self::PipelineExec => "POST /pipelining/exec",
            Self::TransactionExec => "POST /transactions/exec",
        }
    }

    /// One-line description and parameter list.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Health => "Check gateway health ()",
            Self::KeysGet => "Get a string value (key)",
            Self::KeysSet => "Set a string value (key, value, ex?: seconds)",
            Self::KeysDel => "Delete keys (keys: [string])",
            Self::KeysIncr => "Increment an integer value (key)",
            Self::KeysExpire => "Expire a key after a number of seconds (key, seconds)",
            Self::KeysTtl => "Get the remaining time to live in seconds (key)",
            Self::KeysExists => "Count how many keys exist (keys: [string])",
            Self::KeysRename => "Rename a key (key, newKey)",
            Self::KeysType => "Get the data type stored at a key (key)",
            Self::HashesGet => "Get one field of a hash (key, field)",
            Self::HashesGetAll => "Get every field of a hash (key)",
            Self::HashesSet => "Set one field of a hash (key, field, value)",
            Self::HashesSetIfAbsent => "Set a hash field only if it is missing (key, field, value)",
            Self::HashesDel => "Delete one field of a hash (key, field)",
            Self::ListsPushLeft => "Push values to the head of a list (key, values: [string])",
            Self::ListsPushRight => "Push values to the tail of a list (key, values: [string])",
            Self::ListsGetRange => "Get list elements by index range (key, start, stop)",
            Self::ListsLength => "Get the length of a list (key)",
            Self::SetsAdd => "Add members to a set (key, members: [string])",
            Self::SetsGetMembers => "Get every member of a set (key)",
            Self::SetsRemove => "Remove members from a set (key, members: [string])",
            Self::SetsCount => "Count the members of a set (key)",
            Self::SortedSetsAdd => {
                "Add scored members to a sorted set (key, members: [{member, score}])"
            }
            Self::SortedSetsGetRange => "Get sorted-set members by rank (key, start, stop)",
            Self::SortedSetsRemove => "Remove members from a sorted set (key, members: [string])",
            Self::SortedSetsCount => "Count the members of a sorted set (key)",
            Self::PipelineExec => "Run commands in one round trip (commands: [{command, args}])",
            Self::TransactionExec => "Run commands atomically (commands: [{command, args}])",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| ClientError::UnknownOperation(s.to_string()))
    }
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Operation name, e.g. `sets.add`.
    pub function: String,
    /// Positional parameters.
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WorkflowStep {
    pub fn new(function: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            params,
            description: None,
        }
    }
}

// =============================================================================
// Parameter extraction
// =============================================================================

fn param<'a>(op: Operation, params: &'a [Value], index: usize, name: &str) -> Result<&'a Value> {
    params.get(index).ok_or_else(|| {
        ClientError::InvalidInput(format!("{}: missing parameter #{} ({})", op, index, name))
    })
}

fn param_str<'a>(op: Operation, params: &'a [Value], index: usize, name: &str) -> Result<&'a str> {
    param(op, params, index, name)?.as_str().ok_or_else(|| {
        ClientError::InvalidInput(format!("{}: parameter {} must be a string", op, name))
    })
}

fn param_i64(op: Operation, params: &[Value], index: usize, name: &str) -> Result<i64> {
    param(op, params, index, name)?.as_i64().ok_or_else(|| {
        ClientError::InvalidInput(format!("{}: parameter {} must be an integer", op, name))
    })
}

fn param_u64(op: Operation, params: &[Value], index: usize, name: &str) -> Result<u64> {
    param(op, params, index, name)?.as_u64().ok_or_else(|| {
        ClientError::InvalidInput(format!(
            "{}: parameter {} must be a non-negative integer",
            op, name
        ))
    })
}

/// A trailing parameter that may be absent or `null`.
fn param_opt_u64(op: Operation, params: &[Value], index: usize, name: &str) -> Result<Option<u64>> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => param_u64(op, params, index, name).map(Some),
    }
}

fn param_strings(op: Operation, params: &[Value], index: usize, name: &str) -> Result<Vec<String>> {
    let value = param(op, params, index, name)?;
    let invalid = || {
        ClientError::InvalidInput(format!(
            "{}: parameter {} must be a list of strings",
            op, name
        ))
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn param_de<T: serde::de::DeserializeOwned>(
    op: Operation,
    params: &[Value],
    index: usize,
    name: &str,
) -> Result<T> {
    let value = param(op, params, index, name)?;
    serde_json::from_value(value.clone()).map_err(|e| {
        ClientError::InvalidInput(format!("{}: invalid parameter {}: {}", op, name, e))
    })
}

// =============================================================================
// Dispatch
// =============================================================================

impl GatewayClient {
    /// Run one operation with positional JSON parameters.
    #[instrument(skip(self, params), fields(operation = %op))]
    pub async fn dispatch(&self, op: Operation, params: &[Value]) -> Result<Value> {
        debug!(params = params.len(), "Dispatching operation");

        let result = match op {
            Operation::Health => self.health().await?,
            Operation::KeysGet => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.keys().get(key).await?)
            }
            Operation::KeysSet => {
                let key = param_str(op, params, 0, "key")?;
                let value = param_str(op, params, 1, "value")?;
                let ex = param_opt_u64(op, params, 2, "ex")?;
                self.keys().set(key, value, ex).await?;
                Value::Null
            }
            Operation::KeysDel => {
                let keys = param_strings(op, params, 0, "keys")?;
                json!(self.keys().del(&keys).await?)
            }
            Operation::KeysIncr => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.keys().incr(key).await?)
            }
            Operation::KeysExpire => {
                let key = param_str(op, params, 0, "key")?;
                let seconds = param_u64(op, params, 1, "seconds")?;
                self.keys().expire(key, seconds).await?;
                Value::Null
            }
            Operation::KeysTtl => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.keys().ttl(key).await?)
            }
            Operation::KeysExists => {
                let keys = param_strings(op, params, 0, "keys")?;
                json!(self.keys().exists(&keys).await?)
            }
            Operation::KeysRename => {
                let key = param_str(op, params, 0, "key")?;
                let new_key = param_str(op, params, 1, "newKey")?;
                self.keys().rename(key, new_key).await?;
                Value::Null
            }
            Operation::KeysType => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.keys().key_type(key).await?)
            }
            Operation::HashesGet => {
                let key = param_str(op, params, 0, "key")?;
                let field = param_str(op, params, 1, "field")?;
                json!(self.hashes().get(key, field).await?)
            }
            Operation::HashesGetAll => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.hashes().get_all(key).await?)
            }
            Operation::HashesSet => {
                let key = param_str(op, params, 0, "key")?;
                let field = param_str(op, params, 1, "field")?;
                let value = param_str(op, params, 2, "value")?;
                self.hashes().set(key, field, value).await?;
                Value::Null
            }
            Operation::HashesSetIfAbsent => {
                let key = param_str(op, params, 0, "key")?;
                let field = param_str(op, params, 1, "field")?;
                let value = param_str(op, params, 2, "value")?;
                json!(self.hashes().set_if_absent(key, field, value).await?)
            }
            Operation::HashesDel => {
                let key = param_str(op, params, 0, "key")?;
                let field = param_str(op, params, 1, "field")?;
                json!(self.hashes().delete(key, field).await?)
            }
            Operation::ListsPushLeft | Operation::ListsPushRight => {
                let key = param_str(op, params, 0, "key")?;
                let values = param_strings(op, params, 1, "values")?;
                let len = if op == Operation::ListsPushLeft {
                    self.lists().push_left(key, &values).await?
                } else {
                    self.lists().push_right(key, &values).await?
                };
                json!(len)
            }
            Operation::ListsGetRange => {
                let key = param_str(op, params, 0, "key")?;
                let start = param_i64(op, params, 1, "start")?;
                let stop = param_i64(op, params, 2, "stop")?;
                json!(self.lists().range(key, start, stop).await?)
            }
            Operation::ListsLength => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.lists().len(key).await?)
            }
            Operation::SetsAdd => {
                let key = param_str(op, params, 0, "key")?;
                let members = param_strings(op, params, 1, "members")?;
                json!(self.sets().add(key, &members).await?)
            }
            Operation::SetsGetMembers => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.sets().members(key).await?)
            }
            Operation::SetsRemove => {
                let key = param_str(op, params, 0, "key")?;
                let members = param_strings(op, params, 1, "members")?;
                json!(self.sets().remove(key, &members).await?)
            }
            Operation::SetsCount => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.sets().count(key).await?)
            }
            Operation::SortedSetsAdd => {
                let key = param_str(op, params, 0, "key")?;
                let members: Vec<ScoredMember> = param_de(op, params, 1, "members")?;
                json!(self.sorted_sets().add(key, &members).await?)
            }
            Operation::SortedSetsGetRange => {
                let key = param_str(op, params, 0, "key")?;
                let start = param_i64(op, params, 1, "start")?;
                let stop = param_i64(op, params, 2, "stop")?;
                json!(self.sorted_sets().range_with_scores(key, start, stop).await?)
            }
            Operation::SortedSetsRemove => {
                let key = param_str(op, params, 0, "key")?;
                let members = param_strings(op, params, 1, "members")?;
                json!(self.sorted_sets().remove(key, &members).await?)
            }
            Operation::SortedSetsCount => {
                let key = param_str(op, params, 0, "key")?;
                json!(self.sorted_sets().cardinality(key).await?)
            }
            Operation::PipelineExec | Operation::TransactionExec => {
                let commands: Vec<Command> = param_de(op, params, 0, "commands")?;
                let mode = if op == Operation::TransactionExec {
                    ExecMode::Transaction
                } else {
                    ExecMode::Pipeline
                };
                let pipeline = commands
                    .into_iter()
                    .fold(self.pipeline(), |p, cmd| p.command(&cmd.command, cmd.args));
                json!(pipeline.execute(mode).await?)
            }
        };

        Ok(result)
    }

    /// Run workflow steps in order and return one result per step.
    ///
    /// All step names are resolved before the first request; a failing step
    /// stops the workflow and its error is returned.
    #[instrument(skip(self, steps), fields(steps = steps.len()))]
    pub async fn run_workflow(&self, steps: &[WorkflowStep]) -> Result<Vec<Value>> {
        let resolved = steps
            .iter()
            .map(|step| step.function.parse::<Operation>())
            .collect::<Result<Vec<_>>>()?;

        let mut results = Vec::with_capacity(steps.len());
        for (op, step) in resolved.into_iter().zip(steps) {
            results.push(self.dispatch(op, &step.params).await?);
        }
        Ok(results)
    }
}
