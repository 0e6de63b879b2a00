//! Held-lock guard.

use cronlock_core::error::LockResult;
use cronlock_core::path::LockPath;
use cronlock_core::sequence::Candidate;
use cronlock_core::session::{CoordinationSession, SessionMonitor};
use tokio::sync::watch;
use tracing::instrument;

/// A held lock.
///
/// The candidate entry is never deleted explicitly: `release` closes the
/// session and the service removes every ephemeral the session owned.
/// Dropping the guard without releasing defers to the session handle's own
/// teardown, but the async `release` allows proper error handling.
pub struct LockGuard<S: CoordinationSession> {
    session: S,
    path: LockPath,
    candidate: Candidate,
    monitor: SessionMonitor,
}

impl<S: CoordinationSession> LockGuard<S> {
    pub(crate) fn new(session: S, path: LockPath, candidate: Candidate) -> Self {
        let monitor = SessionMonitor::spawn(session.session_id(), session.events());
        Self {
            session,
            path,
            candidate,
            monitor,
        }
    }

    /// The lock directory this guard holds.
    pub fn path(&self) -> &LockPath {
        &self.path
    }

    /// Our candidate entry, head of the sibling order at acquisition time.
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Receiver that yields `true` if the lock is lost (session expiry or
    /// authentication failure) while held.
    pub fn lost_token(&self) -> &watch::Receiver<bool> {
        self.monitor.lost_token()
    }

    /// Releases the lock by ending the session.
    #[instrument(skip(self), fields(lock.path = %self.path, candidate = %self.candidate))]
    pub async fn release(self) -> LockResult<()> {
        self.session.close().await?;
        Ok(())
    }
}
