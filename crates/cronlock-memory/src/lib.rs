//! In-memory coordination service implementing the cronlock contract.
//!
//! A single-process stand-in for a real consensus-backed ensemble:
//! hierarchical nodes, per-parent atomic sequence suffixes, session-scoped
//! ephemerals, removal watches, and scripted fault injection for tests.

pub mod faults;
pub mod service;
pub mod session;

pub use faults::{Fault, OpKind};
pub use service::MemoryEnsemble;
pub use session::MemorySession;
