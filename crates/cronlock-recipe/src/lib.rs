//! The sequence-node lock recipe.
//!
//! Acquisition creates a self-removing candidate entry under a shared lock
//! directory, orders the sibling candidates by their service-assigned
//! sequence suffixes, and holds the lock iff its own candidate is the head
//! of that order. Blocked processes learn their floor predecessor rather
//! than the holder, so a release wakes one waiter instead of the herd.

pub mod decision;
pub mod ensure;
pub mod handle;
pub mod lock;
pub mod registrar;

pub use decision::{decide, order_candidates, LockDecision};
pub use ensure::ensure_lock_path;
pub use handle::LockGuard;
pub use lock::{AcquireOutcome, BlockedBehavior, SequenceLock, SequenceLockOptions};
pub use registrar::register_or_find;
