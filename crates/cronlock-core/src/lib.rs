//! Core contract and types for sequence-node distributed locks.

pub mod error;
pub mod path;
pub mod prelude;
pub mod retry;
pub mod sequence;
pub mod session;

pub use error::{CoordinationError, LockError, LockResult};
pub use prelude::*;
