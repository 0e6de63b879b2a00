//! Scripted fault injection for the in-memory ensemble.

use std::collections::{HashMap, VecDeque};

use cronlock_core::error::CoordinationError;

/// Operation classes a fault can be scripted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Exists,
    Create,
    Children,
    WatchRemoval,
}

/// One scripted failure, consumed by the next matching operation.
#[derive(Debug, Clone)]
pub struct Fault {
    pub(crate) error: CoordinationError,
    pub(crate) apply_first: bool,
}

impl Fault {
    /// The operation fails without touching the tree.
    pub fn fail(error: CoordinationError) -> Self {
        Self {
            error,
            apply_first: false,
        }
    }

    /// The operation takes effect, but its acknowledgement is lost and the
    /// caller sees `error` instead. Models a create that lands while the
    /// success response dies with the connection.
    pub fn ack_lost(error: CoordinationError) -> Self {
        Self {
            error,
            apply_first: true,
        }
    }
}

/// FIFO of scripted faults per operation class.
#[derive(Debug, Default)]
pub(crate) struct FaultPlan {
    queues: HashMap<OpKind, VecDeque<Fault>>,
}

impl FaultPlan {
    pub(crate) fn push(&mut self, kind: OpKind, fault: Fault) {
        self.queues.entry(kind).or_default().push_back(fault);
    }

    pub(crate) fn take(&mut self, kind: OpKind) -> Option<Fault> {
        self.queues.get_mut(&kind).and_then(|q| q.pop_front())
    }
}
