// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK-specific error types.

use kvgate_client::ClientError;
use thiserror::Error;

/// Errors that can occur in the SDK.
///
/// A failed call to the store is never reported as `Ok(false)` or an empty
/// result. Callers that treat "lock not acquired" differently from "could not
/// reach the store" match on [`SdkError::is_transport`].
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error (missing or invalid environment variable)
    #[error("configuration error: {0}")]
    Config(String),

    /// The store could not be reached or rejected the request
    #[error("transport error: {0}")]
    Transport(#[source] ClientError),

    /// The store answered with data of the wrong shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Caller passed an empty or otherwise unusable argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The named record does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

impl SdkError {
    /// Whether the error came from talking to the store.
    pub fn is_transport(&self) -> bool {
        matches!(self, SdkError::Transport(_) | SdkError::MalformedResponse(_))
    }
}

impl From<ClientError> for SdkError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Config(msg) => SdkError::Config(msg),
            ClientError::UnexpectedResponse(msg) => SdkError::MalformedResponse(msg),
            ClientError::InvalidInput(msg) | ClientError::UnknownOperation(msg) => {
                SdkError::InvalidInput(msg)
            }
            ClientError::Serialization(msg) => SdkError::Serialization(msg),
            other => SdkError::Transport(other),
        }
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Serialization(err.to_string())
    }
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Reject empty identifiers before they reach the store.
pub(crate) fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SdkError::InvalidInput(format!("{} must not be empty", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        let err: SdkError = ClientError::Connection("refused".to_string()).into();
        assert!(matches!(err, SdkError::Transport(_)));
        assert!(err.is_transport());

        let err: SdkError = ClientError::Timeout(100).into();
        assert!(matches!(err, SdkError::Transport(ClientError::Timeout(100))));

        let err: SdkError = ClientError::UnexpectedResponse("bad".to_string()).into();
        assert!(matches!(err, SdkError::MalformedResponse(_)));
        assert!(err.is_transport());

        let err: SdkError = ClientError::InvalidInput("x".to_string()).into();
        assert!(matches!(err, SdkError::InvalidInput(_)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("owner id", "worker-1").is_ok());
        let err = require_non_empty("owner id", "").unwrap_err();
        assert!(err.to_string().contains("owner id must not be empty"));
    }
}
