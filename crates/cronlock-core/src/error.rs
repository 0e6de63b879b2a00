//! Error types for coordination-service calls and lock operations.

use std::time::Duration;
use thiserror::Error;

/// Outcome of a single coordination-service call.
///
/// Every call site classifies the error before deciding what to do next:
/// transient errors are retried with a bounded budget, expected permanent
/// errors trigger a corrective action (e.g. create on `NoNode`), and fatal
/// errors abort the current attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// The connection to the service was lost mid-call. Retriable.
    #[error("connection loss to the server")]
    ConnectionLoss,

    /// The addressed node does not exist.
    #[error("no node: {0}")]
    NoNode(String),

    /// A plain (non-sequential) create hit an existing node.
    #[error("node already exists: {0}")]
    NodeExists(String),

    /// The session failed authentication. Fatal.
    #[error("authentication failure")]
    AuthFailed,

    /// The session expired; every ephemeral it owned is gone. Fatal.
    #[error("session expired")]
    Expired,

    /// The session was closed. Fatal for further calls.
    #[error("session closed")]
    Closed,

    /// The path is not a valid hierarchical namespace path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl CoordinationError {
    /// True for errors that a bounded retry loop may re-attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionLoss)
    }

    /// True for errors that end the session; no call can succeed after one.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthFailed | Self::Expired | Self::Closed)
    }
}

/// Errors surfaced by the lock protocol itself.
#[derive(Error, Debug)]
pub enum LockError {
    /// A transient condition persisted past the retry budget.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: CoordinationError,
    },

    /// A protocol invariant was violated (empty sibling set, own candidate
    /// missing, duplicate sequence numbers).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A sibling name without a sequence suffix. Precondition violation,
    /// not recoverable.
    #[error("malformed candidate name: {0}")]
    MalformedCandidate(String),

    /// Lock acquisition timed out.
    #[error("lock acquisition timed out after {0:?}")]
    Timeout(Duration),

    /// A coordination-service error that the protocol does not handle.
    #[error(transparent)]
    Session(#[from] CoordinationError),
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
