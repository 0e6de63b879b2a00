//! The lock front type: bounded protocol passes over one session.

use std::time::{Duration, Instant};

use cronlock_core::error::{CoordinationError, LockError, LockResult};
use cronlock_core::path::LockPath;
use cronlock_core::retry::{with_retry, RetryPolicy};
use cronlock_core::sequence::{session_prefix, Candidate};
use cronlock_core::session::{CoordinationSession, SessionState};
use tracing::{debug, instrument, warn, Span};

use crate::decision::{decide, LockDecision};
use crate::ensure::ensure_lock_path;
use crate::handle::LockGuard;
use crate::registrar::register_or_find;

/// What to do when the decision comes back blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockedBehavior {
    /// Report the floor predecessor and return, the original tool's
    /// contract: a blocked cron job simply yields this run.
    #[default]
    Report,
    /// Subscribe to the predecessor's removal and re-run the decision
    /// until held or timed out.
    Wait,
}

/// Acquisition options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceLockOptions {
    /// Retry budget for service calls and for whole protocol passes.
    pub retry: RetryPolicy,
    /// Behavior when blocked behind a predecessor.
    pub blocked: BlockedBehavior,
}

/// Result of an acquisition attempt.
pub enum AcquireOutcome<S: CoordinationSession> {
    /// We are the head of the sibling order.
    Held(LockGuard<S>),
    /// Someone is ahead; `predecessor` is our floor entry. Only returned
    /// under [`BlockedBehavior::Report`].
    Blocked { predecessor: Candidate },
}

/// A distributed mutual-exclusion lock over a coordination-service session.
///
/// Independent processes each run their own `SequenceLock` against the
/// same lock directory; the service's atomic sequence assignment is the
/// sole synchronization mechanism. The session handle must be cloneable,
/// with clones sharing the underlying session.
pub struct SequenceLock<S> {
    session: S,
    path: LockPath,
    options: SequenceLockOptions,
}

impl<S: CoordinationSession + Clone> SequenceLock<S> {
    /// Creates a lock over `path` with default options.
    pub fn new(session: S, path: LockPath) -> Self {
        Self::with_options(session, path, SequenceLockOptions::default())
    }

    pub fn with_options(session: S, path: LockPath, options: SequenceLockOptions) -> Self {
        Self {
            session,
            path,
            options,
        }
    }

    /// The lock directory.
    pub fn path(&self) -> &LockPath {
        &self.path
    }

    /// Attempts to acquire the lock within `timeout` (`None` waits
    /// indefinitely in [`BlockedBehavior::Wait`] mode).
    ///
    /// Ensures the lock directory once, then runs protocol passes —
    /// register-or-find, enumerate, decide — each pass recomputing the
    /// sibling set from scratch. Transient pass failures are retried up to
    /// the budget; fatal ones abort immediately.
    #[instrument(
        skip(self),
        fields(lock.path = %self.path, session = %self.session.session_id(), timeout = ?timeout)
    )]
    pub async fn acquire(&self, timeout: Option<Duration>) -> LockResult<AcquireOutcome<S>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        ensure_lock_path(&self.session, &self.path, &self.options.retry).await?;
        let prefix = session_prefix(self.session.session_id());

        let mut passes = 0;
        let mut last_transient = CoordinationError::ConnectionLoss;
        while passes < self.options.retry.max_attempts {
            passes += 1;
            if let (Some(deadline), Some(timeout)) = (deadline, timeout) {
                if Instant::now() >= deadline {
                    return Err(LockError::Timeout(timeout));
                }
            }

            match self.protocol_pass(&prefix).await {
                Ok((mine, LockDecision::Held)) => {
                    Span::current().record("acquired", true);
                    debug!(candidate = %mine, "lock held");
                    return Ok(AcquireOutcome::Held(LockGuard::new(
                        self.session.clone(),
                        self.path.clone(),
                        mine,
                    )));
                }
                Ok((mine, LockDecision::Blocked { predecessor })) => match self.options.blocked {
                    BlockedBehavior::Report => {
                        Span::current().record("acquired", false);
                        debug!(candidate = %mine, predecessor = %predecessor, "blocked");
                        return Ok(AcquireOutcome::Blocked { predecessor });
                    }
                    BlockedBehavior::Wait => {
                        match self.wait_for(&predecessor, deadline, timeout).await {
                            Ok(()) => {
                                // The predecessor is gone; that is real
                                // progress, so the pass budget starts over.
                                passes = 0;
                            }
                            Err(err) if pass_retriable(&err) => {
                                if let Some(source) = transient_source(&err) {
                                    last_transient = source;
                                }
                                warn!(error = %err, pass = passes, "predecessor watch failed, retrying");
                                tokio::time::sleep(self.options.retry.delay).await;
                            }
                            Err(err) => return Err(err),
                        }
                    }
                },
                Err(err) if pass_retriable(&err) => {
                    if let Some(source) = transient_source(&err) {
                        last_transient = source;
                    }
                    warn!(error = %err, pass = passes, "protocol pass failed, retrying");
                    tokio::time::sleep(self.options.retry.delay).await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(LockError::RetriesExhausted {
            attempts: passes,
            source: last_transient,
        })
    }

    /// Runs a single protocol pass without waiting.
    ///
    /// Returns `Ok(None)` when blocked, leaving our candidate registered
    /// for the session's lifetime.
    #[instrument(
        skip(self),
        fields(lock.path = %self.path, session = %self.session.session_id())
    )]
    pub async fn try_acquire(&self) -> LockResult<Option<LockGuard<S>>> {
        ensure_lock_path(&self.session, &self.path, &self.options.retry).await?;
        let prefix = session_prefix(self.session.session_id());

        match self.protocol_pass(&prefix).await? {
            (mine, LockDecision::Held) => {
                Span::current().record("acquired", true);
                Ok(Some(LockGuard::new(
                    self.session.clone(),
                    self.path.clone(),
                    mine,
                )))
            }
            (_, LockDecision::Blocked { .. }) => {
                Span::current().record("acquired", false);
                Ok(None)
            }
        }
    }

    /// One pass: register-or-find our candidate, re-enumerate, decide.
    async fn protocol_pass(&self, prefix: &str) -> LockResult<(Candidate, LockDecision)> {
        let mine =
            register_or_find(&self.session, &self.path, prefix, &self.options.retry).await?;
        let siblings = with_retry(&self.options.retry, "children", || {
            self.session.children(&self.path)
        })
        .await?;
        let decision = decide(&siblings, &mine)?;
        Ok((mine, decision))
    }

    /// Blocks until the predecessor entry is removed, the deadline passes,
    /// or the session terminally ends.
    async fn wait_for(
        &self,
        predecessor: &Candidate,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> LockResult<()> {
        let node = self.path.join(predecessor.name())?;
        let watch = match self.session.watch_removal(&node).await {
            Ok(watch) => watch,
            // Already gone between the enumeration and the watch.
            Err(CoordinationError::NoNode(_)) => return Ok(()),
            Err(err) => return Err(LockError::Session(err)),
        };
        debug!(predecessor = %predecessor, "waiting for predecessor removal");

        let mut events = self.session.events();
        let removal = async move {
            tokio::select! {
                _ = watch.removed() => Ok(()),
                state = async {
                    loop {
                        let state = *events.borrow_and_update();
                        if state.is_terminal() {
                            return state;
                        }
                        if events.changed().await.is_err() {
                            return SessionState::Closed;
                        }
                    }
                } => Err(LockError::Session(match state {
                    SessionState::Expired => CoordinationError::Expired,
                    SessionState::AuthFailed => CoordinationError::AuthFailed,
                    _ => CoordinationError::Closed,
                })),
            }
        };

        match deadline {
            None => removal.await,
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::timeout(remaining, removal)
                    .await
                    .map_err(|_| LockError::Timeout(timeout.unwrap_or(remaining)))?
            }
        }
    }
}

/// A failed pass is retried when the cause could clear on its own; fatal
/// session errors and protocol violations abort the whole attempt.
fn pass_retriable(err: &LockError) -> bool {
    match err {
        LockError::RetriesExhausted { source, .. } => !source.is_fatal(),
        LockError::Session(source) => !source.is_fatal(),
        _ => false,
    }
}

fn transient_source(err: &LockError) -> Option<CoordinationError> {
    match err {
        LockError::RetriesExhausted { source, .. } | LockError::Session(source) => {
            Some(source.clone())
        }
        _ => None,
    }
}
