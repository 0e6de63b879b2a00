//! The coordination-service client contract and session-state events.

use std::fmt;
use std::future::Future;

use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info};

use crate::error::CoordinationError;
use crate::path::LockPath;

/// Opaque session identifier, stable for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Session lifecycle states, delivered on the session's event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Expired,
    AuthFailed,
    Closed,
}

impl SessionState {
    /// True once no further call on this session can succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::AuthFailed | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Expired => "EXPIRED",
            Self::AuthFailed => "AUTH_FAILED",
            Self::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Creation mode for namespace nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Plain node that outlives every session. Never sequence-suffixed.
    Persistent,
    /// Session-owned node with a service-assigned sequence suffix; removed
    /// automatically when the owning session ends.
    EphemeralSequential,
}

/// Metadata returned by an existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    /// Service revision at which the node was created.
    pub create_revision: u64,
    /// Owning session for ephemeral nodes.
    pub ephemeral_owner: Option<SessionId>,
    /// Direct child count.
    pub num_children: usize,
}

/// Resolves when a watched node is removed or its session view ends.
pub struct RemovalWatch {
    rx: oneshot::Receiver<()>,
}

impl RemovalWatch {
    pub fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx }
    }

    /// Waits for the removal notification.
    pub async fn removed(self) {
        // A dropped sender means the service side went away; either way the
        // watcher should re-check the tree rather than keep waiting.
        let _ = self.rx.await;
    }
}

/// Client contract the lock protocol consumes, abstracted from any
/// concrete coordination-service library.
///
/// Implementations represent one authenticated session. Cloned handles
/// share the session; all ephemerals the session owns disappear together
/// when it ends.
pub trait CoordinationSession: Send + Sync {
    /// The session identifier, stable until the session ends.
    fn session_id(&self) -> SessionId;

    /// Typed session-state transitions. The channel holds the latest state.
    fn events(&self) -> watch::Receiver<SessionState>;

    /// Probes a node, returning its metadata when present.
    fn exists(
        &self,
        path: &LockPath,
    ) -> impl Future<Output = Result<Option<NodeStat>, CoordinationError>> + Send;

    /// Creates a node, returning the full assigned path. For
    /// [`CreateMode::EphemeralSequential`] the service appends the sequence
    /// suffix atomically; the returned path carries it.
    fn create(
        &self,
        path: &LockPath,
        mode: CreateMode,
    ) -> impl Future<Output = Result<String, CoordinationError>> + Send;

    /// Enumerates the direct children of a node.
    fn children(
        &self,
        path: &LockPath,
    ) -> impl Future<Output = Result<Vec<String>, CoordinationError>> + Send;

    /// Registers a removal watch on an existing node.
    fn watch_removal(
        &self,
        path: &LockPath,
    ) -> impl Future<Output = Result<RemovalWatch, CoordinationError>> + Send;

    /// Ends the session, releasing every ephemeral it owns. Idempotent.
    fn close(&self) -> impl Future<Output = Result<(), CoordinationError>> + Send;
}

/// Observes a session's event channel, logging transitions and deriving a
/// lost token that flips to `true` once the session is terminally gone.
///
/// Decoupled from the lock decision logic: the protocol never inspects raw
/// events, it only consults the derived token.
pub struct SessionMonitor {
    lost_receiver: watch::Receiver<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl SessionMonitor {
    /// Spawns the monitor task over a session's event channel.
    pub fn spawn(session: SessionId, mut events: watch::Receiver<SessionState>) -> Self {
        let (lost_sender, lost_receiver) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                let state = *events.borrow_and_update();
                match state {
                    SessionState::Connecting => {
                        debug!(session = %session, state = %state, "session state");
                    }
                    SessionState::Connected => {
                        info!(session = %session, "got a new session id");
                    }
                    SessionState::AuthFailed => {
                        error!(session = %session, "authentication failure, shutting down");
                        let _ = lost_sender.send(true);
                        break;
                    }
                    SessionState::Expired => {
                        error!(session = %session, "session expired, shutting down");
                        let _ = lost_sender.send(true);
                        break;
                    }
                    SessionState::Closed => {
                        debug!(session = %session, "session closed");
                        let _ = lost_sender.send(true);
                        break;
                    }
                }
                if events.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            lost_receiver,
            task,
        }
    }

    /// Receiver that yields `true` once the session is terminally gone.
    pub fn lost_token(&self) -> &watch::Receiver<bool> {
        &self.lost_receiver
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
