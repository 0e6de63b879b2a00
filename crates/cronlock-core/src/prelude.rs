//! Convenience prelude for the core lock types.

pub use crate::error::{CoordinationError, LockError, LockResult};
pub use crate::path::LockPath;
pub use crate::retry::{with_retry, RetryPolicy};
pub use crate::sequence::{session_prefix, Candidate};
pub use crate::session::{
    CoordinationSession, CreateMode, NodeStat, RemovalWatch, SessionId, SessionMonitor,
    SessionState,
};
