use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("DynamoDB API error: {0}")]
    DynamoDb(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The predicate never held before the deadline.
    #[error("timed out after {elapsed:?} waiting for {description}; last observed: {last_observed}")]
    ConvergenceTimeout {
        description: String,
        elapsed: Duration,
        last_observed: String,
    },

    /// Polling finished but the strict post-check found wrong final values.
    #[error("converged to the wrong state: {message}; last observed: {last_observed}")]
    ConvergenceMismatch {
        message: String,
        last_observed: String,
    },

    #[error("terminal condition {condition_type} appeared with unexpected message {actual:?} (expected it to contain {expected:?})")]
    UnexpectedTerminalReason {
        condition_type: String,
        expected: String,
        actual: String,
    },

    #[error("terminal condition {condition_type} never appeared within {elapsed:?}; last observed: {last_observed}")]
    TerminalConditionNeverAppeared {
        condition_type: String,
        elapsed: Duration,
        last_observed: String,
    },
}

/// Short alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn mismatch(msg: impl Into<String>, last_observed: impl std::fmt::Debug) -> Self {
        Self::ConvergenceMismatch {
            message: msg.into(),
            last_observed: format!("{last_observed:?}"),
        }
    }

    /// Collaborator call failures (auth, network, malformed request).
    /// These abort a scenario immediately and are never retried.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Kube(_) | Self::DynamoDb(_))
    }
}
