//! Client session handle for the in-memory ensemble.

use std::sync::{Arc, Mutex};

use cronlock_core::error::CoordinationError;
use cronlock_core::path::LockPath;
use cronlock_core::session::{
    CoordinationSession, CreateMode, NodeStat, RemovalWatch, SessionId, SessionState,
};
use tokio::sync::watch;

use crate::service::{close_session, EnsembleState};

/// Shared ownership of one session. When the last handle drops, the
/// session ends exactly as an explicit `close` would, so ephemerals are
/// released deterministically on every exit path.
pub(crate) struct SessionCore {
    inner: Arc<Mutex<EnsembleState>>,
    id: SessionId,
}

impl SessionCore {
    pub(crate) fn new(inner: Arc<Mutex<EnsembleState>>, id: SessionId) -> Self {
        Self { inner, id }
    }
}

impl Drop for SessionCore {
    fn drop(&mut self) {
        close_session(&mut self.inner.lock().unwrap(), self.id);
    }
}

/// Handle to one session on a [`crate::MemoryEnsemble`].
///
/// Clones share the session; `close` is idempotent. For prompt cleanup call
/// `close` explicitly — dropping the last clone also ends the session.
#[derive(Clone)]
pub struct MemorySession {
    core: Arc<SessionCore>,
    ensemble: crate::MemoryEnsemble,
    events: watch::Receiver<SessionState>,
}

impl MemorySession {
    pub(crate) fn new(
        ensemble: crate::MemoryEnsemble,
        core: Arc<SessionCore>,
        events: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            core,
            ensemble,
            events,
        }
    }
}

impl CoordinationSession for MemorySession {
    fn session_id(&self) -> SessionId {
        self.core.id
    }

    fn events(&self) -> watch::Receiver<SessionState> {
        self.events.clone()
    }

    async fn exists(&self, path: &LockPath) -> Result<Option<NodeStat>, CoordinationError> {
        self.ensemble.op_exists(self.core.id, path)
    }

    async fn create(
        &self,
        path: &LockPath,
        mode: CreateMode,
    ) -> Result<String, CoordinationError> {
        self.ensemble.op_create(self.core.id, path, mode)
    }

    async fn children(&self, path: &LockPath) -> Result<Vec<String>, CoordinationError> {
        self.ensemble.op_children(self.core.id, path)
    }

    async fn watch_removal(&self, path: &LockPath) -> Result<RemovalWatch, CoordinationError> {
        self.ensemble.op_watch_removal(self.core.id, path)
    }

    async fn close(&self) -> Result<(), CoordinationError> {
        close_session(&mut self.core.inner.lock().unwrap(), self.core.id);
        Ok(())
    }
}
