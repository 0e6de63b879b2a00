//! Distributed mutual exclusion for cron-style jobs, built on a
//! hierarchical, sequential-node coordination primitive.
//!
//! Independent processes agree on which one may proceed without any direct
//! communication: each creates a self-removing candidate entry under a
//! shared lock directory, and the process whose candidate carries the
//! smallest service-assigned sequence number holds the lock. Blocked
//! processes learn the neighbor directly ahead of them, not the holder,
//! so one release wakes one waiter.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cronlock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // In-process reference service; real deployments bind their own
//!     // `CoordinationSession` implementation.
//!     let ensemble = MemoryEnsemble::new();
//!     let session = ensemble.connect();
//!
//!     let lock = SequenceLock::new(session, LockPath::parse("/jobs/nightly")?);
//!     match lock.acquire(Some(Duration::from_secs(5))).await? {
//!         AcquireOutcome::Held(guard) => {
//!             println!("we hold the lock");
//!             guard.release().await?;
//!         }
//!         AcquireOutcome::Blocked { predecessor } => {
//!             println!("LOCKED: blocked behind {predecessor}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports:
//! - `cronlock-core`: the client contract, data model, errors, and retry
//!   orchestration
//! - `cronlock-recipe`: the lock protocol itself
//! - `cronlock-memory`: the in-memory reference coordination service
//!
//! For fine-grained control, depend on the individual crates instead.

// Re-export core contract and types
pub use cronlock_core::*;

// Re-export the lock protocol
pub use cronlock_recipe::*;

// The memory crate's `session` module would shadow the core one under a
// glob, so its items are re-exported by name.
pub use cronlock_memory::{Fault, MemoryEnsemble, MemorySession, OpKind};
