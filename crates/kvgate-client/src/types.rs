// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Public request and response types for the gateway API.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A sorted-set member together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    /// Member name.
    pub member: String,
    /// Score (the gateway stores scores as doubles).
    pub score: f64,
}

impl ScoredMember {
    /// Create a new scored member.
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// One end of a score range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    /// A concrete, inclusive score.
    Inclusive(f64),
    /// Positive infinity (`+inf`).
    PosInf,
    /// Negative infinity (`-inf`).
    NegInf,
}

impl Serialize for ScoreBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ScoreBound::Inclusive(score) => serializer.serialize_f64(*score),
            ScoreBound::PosInf => serializer.serialize_str("+inf"),
            ScoreBound::NegInf => serializer.serialize_str("-inf"),
        }
    }
}

impl From<f64> for ScoreBound {
    fn from(score: f64) -> Self {
        ScoreBound::Inclusive(score)
    }
}

impl From<i64> for ScoreBound {
    fn from(score: i64) -> Self {
        ScoreBound::Inclusive(score as f64)
    }
}

/// Which direction a list push goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListEnd {
    /// Head of the list (`lpush`).
    Left,
    /// Tail of the list (`rpush`).
    #[default]
    Right,
}

/// A single page returned by `keys/scan`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanPage {
    /// Cursor for the next page, `"0"` once iteration is complete.
    pub cursor: String,
    /// Keys in this page.
    pub keys: Vec<String>,
}

impl ScanPage {
    /// Whether the scan is finished.
    pub fn is_complete(&self) -> bool {
        self.cursor == "0"
    }
}

/// A raw command sent to the pipeline or transaction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Lower-case command name (`hset`, `zadd`, ...).
    pub command: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl Command {
    /// Create a new command.
    pub fn new(command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

/// How a batch of commands is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Commands are sent in one round trip but not isolated.
    #[default]
    Pipeline,
    /// Commands run atomically (MULTI/EXEC).
    Transaction,
}

impl ExecMode {
    /// Gateway route for this mode.
    pub fn route(&self) -> &'static str {
        match self {
            ExecMode::Pipeline => "/pipelining/exec",
            ExecMode::Transaction => "/transactions/exec",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecMode::Pipeline => "pipeline",
            ExecMode::Transaction => "transaction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bound_serialization() {
        assert_eq!(
            serde_json::to_value(ScoreBound::Inclusive(12.0)).unwrap(),
            serde_json::json!(12.0)
        );
        assert_eq!(
            serde_json::to_value(ScoreBound::PosInf).unwrap(),
            serde_json::json!("+inf")
        );
        assert_eq!(
            serde_json::to_value(ScoreBound::NegInf).unwrap(),
            serde_json::json!("-inf")
        );
    }

    #[test]
    fn test_exec_mode_routes() {
        assert_eq!(ExecMode::Pipeline.route(), "/pipelining/exec");
        assert_eq!(ExecMode::Transaction.route(), "/transactions/exec");
        assert_eq!(ExecMode::default(), ExecMode::Pipeline);
    }

    #[test]
    fn test_scan_page_completion() {
        let page = ScanPage {
            cursor: "0".to_string(),
            keys: vec![],
        };
        assert!(page.is_complete());

        let page = ScanPage {
            cursor: "17".to_string(),
            keys: vec!["a".to_string()],
        };
        assert!(!page.is_complete());
    }
}
