// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for kvgate-client.

use thiserror::Error;

/// Result type using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the key-value gateway.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The gateway could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Gateway answered with a non-success status.
    #[error("server error [{status}]: {message}")]
    Server { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation name not present in the registry.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

impl ClientError {
    /// Whether the failure happened on the way to or from the gateway, as opposed
    /// to a local problem with the request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_)
                | ClientError::Timeout(_)
                | ClientError::Server { .. }
                | ClientError::UnexpectedResponse(_)
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::UnexpectedResponse(err.to_string())
        } else if err.is_builder() {
            ClientError::Config(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}
