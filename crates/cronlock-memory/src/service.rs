//! The in-memory ensemble: node tree, sessions, sequence counters.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use cronlock_core::error::CoordinationError;
use cronlock_core::path::LockPath;
use cronlock_core::session::{CreateMode, NodeStat, RemovalWatch, SessionId, SessionState};
use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::faults::{Fault, FaultPlan, OpKind};
use crate::session::{MemorySession, SessionCore};

pub(crate) struct NodeRecord {
    create_revision: u64,
    ephemeral_owner: Option<SessionId>,
    // Counter for sequential children; the first assigned suffix is 1.
    next_sequence: u64,
    removal_watchers: Vec<oneshot::Sender<()>>,
}

impl NodeRecord {
    fn new(create_revision: u64, ephemeral_owner: Option<SessionId>) -> Self {
        Self {
            create_revision,
            ephemeral_owner,
            next_sequence: 1,
            removal_watchers: Vec::new(),
        }
    }
}

pub(crate) struct SessionRecord {
    state_tx: watch::Sender<SessionState>,
    end: Option<SessionState>,
}

#[derive(Default)]
pub(crate) struct EnsembleState {
    nodes: BTreeMap<String, NodeRecord>,
    sessions: HashMap<SessionId, SessionRecord>,
    next_session: u64,
    revision: u64,
    faults: FaultPlan,
}

/// A single-process coordination service.
///
/// Clones share the same node tree, so independent sessions connected to
/// clones contend exactly as independent processes would against a real
/// ensemble.
#[derive(Clone)]
pub struct MemoryEnsemble {
    inner: Arc<Mutex<EnsembleState>>,
}

impl MemoryEnsemble {
    pub fn new() -> Self {
        let mut state = EnsembleState::default();
        state.nodes.insert("/".to_string(), NodeRecord::new(0, None));
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Opens a new session. The returned handle starts in
    /// [`SessionState::Connected`]; clones of it share the session.
    pub fn connect(&self) -> MemorySession {
        let mut state = self.inner.lock().unwrap();
        state.next_session += 1;
        let id = SessionId::new(state.next_session);

        let (state_tx, events) = watch::channel(SessionState::Connecting);
        let _ = state_tx.send(SessionState::Connected);
        state.sessions.insert(id, SessionRecord { state_tx, end: None });
        debug!(session = %id, "session opened");

        MemorySession::new(
            self.clone(),
            Arc::new(SessionCore::new(self.inner.clone(), id)),
            events,
        )
    }

    /// Ends a session as the service would on timeout: its ephemerals are
    /// removed, watchers fire, and the event channel reports `Expired`.
    pub fn expire_session(&self, id: SessionId) {
        let mut state = self.inner.lock().unwrap();
        end_session(&mut state, id, SessionState::Expired);
    }

    /// Queues a scripted fault for the next matching operation.
    pub fn inject_fault(&self, kind: OpKind, fault: Fault) {
        self.inner.lock().unwrap().faults.push(kind, fault);
    }

    pub(crate) fn op_exists(
        &self,
        id: SessionId,
        path: &LockPath,
    ) -> Result<Option<NodeStat>, CoordinationError> {
        let mut state = self.inner.lock().unwrap();
        check_session(&state, id)?;
        if let Some(fault) = state.faults.take(OpKind::Exists) {
            return Err(fault.error);
        }
        Ok(stat_of(&state, path.as_str()))
    }

    pub(crate) fn op_create(
        &self,
        id: SessionId,
        path: &LockPath,
        mode: CreateMode,
    ) -> Result<String, CoordinationError> {
        let mut state = self.inner.lock().unwrap();
        check_session(&state, id)?;
        match state.faults.take(OpKind::Create) {
            Some(fault) if fault.apply_first => {
                let _ = apply_create(&mut state, id, path, mode)?;
                Err(fault.error)
            }
            Some(fault) => Err(fault.error),
            None => apply_create(&mut state, id, path, mode),
        }
    }

    pub(crate) fn op_children(
        &self,
        id: SessionId,
        path: &LockPath,
    ) -> Result<Vec<String>, CoordinationError> {
        let mut state = self.inner.lock().unwrap();
        check_session(&state, id)?;
        if let Some(fault) = state.faults.take(OpKind::Children) {
            return Err(fault.error);
        }
        if !state.nodes.contains_key(path.as_str()) {
            return Err(CoordinationError::NoNode(path.to_string()));
        }
        Ok(direct_children(&state, path.as_str()))
    }

    pub(crate) fn op_watch_removal(
        &self,
        id: SessionId,
        path: &LockPath,
    ) -> Result<RemovalWatch, CoordinationError> {
        let mut state = self.inner.lock().unwrap();
        check_session(&state, id)?;
        if let Some(fault) = state.faults.take(OpKind::WatchRemoval) {
            return Err(fault.error);
        }
        let node = state
            .nodes
            .get_mut(path.as_str())
            .ok_or_else(|| CoordinationError::NoNode(path.to_string()))?;
        let (tx, rx) = oneshot::channel();
        node.removal_watchers.push(tx);
        Ok(RemovalWatch::new(rx))
    }
}

impl Default for MemoryEnsemble {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn close_session(state: &mut EnsembleState, id: SessionId) {
    end_session(state, id, SessionState::Closed);
}

fn end_session(state: &mut EnsembleState, id: SessionId, end: SessionState) {
    let Some(record) = state.sessions.get_mut(&id) else {
        return;
    };
    if record.end.is_some() {
        return;
    }
    record.end = Some(end);
    let _ = record.state_tx.send(end);
    debug!(session = %id, state = %end, "session ended");

    let owned: Vec<String> = state
        .nodes
        .iter()
        .filter(|(_, node)| node.ephemeral_owner == Some(id))
        .map(|(path, _)| path.clone())
        .collect();
    for path in owned {
        if let Some(mut node) = state.nodes.remove(&path) {
            debug!(node = %path, "ephemeral removed with its session");
            for watcher in node.removal_watchers.drain(..) {
                let _ = watcher.send(());
            }
        }
    }
}

fn check_session(state: &EnsembleState, id: SessionId) -> Result<(), CoordinationError> {
    match state.sessions.get(&id).and_then(|record| record.end) {
        None if state.sessions.contains_key(&id) => Ok(()),
        Some(SessionState::Expired) => Err(CoordinationError::Expired),
        Some(SessionState::AuthFailed) => Err(CoordinationError::AuthFailed),
        _ => Err(CoordinationError::Closed),
    }
}

fn stat_of(state: &EnsembleState, path: &str) -> Option<NodeStat> {
    state.nodes.get(path).map(|node| NodeStat {
        create_revision: node.create_revision,
        ephemeral_owner: node.ephemeral_owner,
        num_children: direct_children(state, path).len(),
    })
}

fn direct_children(state: &EnsembleState, path: &str) -> Vec<String> {
    let prefix = if path == "/" {
        "/".to_string()
    } else {
        format!("{path}/")
    };
    state
        .nodes
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .filter(|(key, _)| !key[prefix.len()..].contains('/'))
        .filter(|(key, _)| key.as_str() != "/")
        .map(|(key, _)| key[prefix.len()..].to_string())
        .collect()
}

fn apply_create(
    state: &mut EnsembleState,
    id: SessionId,
    path: &LockPath,
    mode: CreateMode,
) -> Result<String, CoordinationError> {
    let parent = path
        .parent()
        .ok_or_else(|| CoordinationError::InvalidPath("cannot create the root".to_string()))?;
    if !state.nodes.contains_key(parent.as_str()) {
        return Err(CoordinationError::NoNode(parent.to_string()));
    }

    state.revision += 1;
    let revision = state.revision;

    match mode {
        CreateMode::Persistent => {
            if state.nodes.contains_key(path.as_str()) {
                return Err(CoordinationError::NodeExists(path.to_string()));
            }
            state
                .nodes
                .insert(path.to_string(), NodeRecord::new(revision, None));
            debug!(node = %path, "persistent node created");
            Ok(path.to_string())
        }
        CreateMode::EphemeralSequential => {
            // The last component is the caller's prefix; the assigned name
            // appends this parent's counter, fixed-width and zero-padded.
            let parent_node = state
                .nodes
                .get_mut(parent.as_str())
                .expect("parent presence checked above");
            let sequence = parent_node.next_sequence;
            parent_node.next_sequence += 1;

            let name = format!("{}{:010}", path.name().unwrap_or_default(), sequence);
            let full = if parent.as_str() == "/" {
                format!("/{name}")
            } else {
                format!("{}/{name}", parent.as_str())
            };
            state
                .nodes
                .insert(full.clone(), NodeRecord::new(revision, Some(id)));
            debug!(node = %full, session = %id, "ephemeral sequential node created");
            Ok(full)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cronlock_core::session::CoordinationSession;

    fn path(s: &str) -> LockPath {
        LockPath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn persistent_create_and_exists() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();

        assert!(session.exists(&path("/xlock")).await.unwrap().is_none());
        session
            .create(&path("/xlock"), CreateMode::Persistent)
            .await
            .unwrap();
        let stat = session.exists(&path("/xlock")).await.unwrap().unwrap();
        assert_eq!(stat.num_children, 0);
        assert_eq!(stat.ephemeral_owner, None);
    }

    #[tokio::test]
    async fn duplicate_persistent_create_reports_node_exists() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session
            .create(&path("/xlock"), CreateMode::Persistent)
            .await
            .unwrap();
        let err = session
            .create(&path("/xlock"), CreateMode::Persistent)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinationError::NodeExists(_)));
    }

    #[tokio::test]
    async fn sequential_suffixes_are_monotonic_per_parent() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session
            .create(&path("/xlock"), CreateMode::Persistent)
            .await
            .unwrap();

        let first = session
            .create(&path("/xlock/x-1-"), CreateMode::EphemeralSequential)
            .await
            .unwrap();
        let second = session
            .create(&path("/xlock/x-1-"), CreateMode::EphemeralSequential)
            .await
            .unwrap();
        assert_eq!(first, "/xlock/x-1-0000000001");
        assert_eq!(second, "/xlock/x-1-0000000002");
        assert!(first < second);
    }

    #[tokio::test]
    async fn children_requires_the_node() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        let err = session.children(&path("/missing")).await.unwrap_err();
        assert!(matches!(err, CoordinationError::NoNode(_)));
    }

    #[tokio::test]
    async fn children_lists_only_direct_descendants() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session
            .create(&path("/a"), CreateMode::Persistent)
            .await
            .unwrap();
        session
            .create(&path("/a/b"), CreateMode::Persistent)
            .await
            .unwrap();
        session
            .create(&path("/a/b/c"), CreateMode::Persistent)
            .await
            .unwrap();

        assert_eq!(session.children(&path("/a")).await.unwrap(), vec!["b"]);
        assert_eq!(session.children(&path("/")).await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn session_end_removes_ephemerals_and_fires_watches() {
        let ensemble = MemoryEnsemble::new();
        let owner = ensemble.connect();
        let observer = ensemble.connect();
        owner
            .create(&path("/xlock"), CreateMode::Persistent)
            .await
            .unwrap();
        let full = owner
            .create(&path("/xlock/x-1-"), CreateMode::EphemeralSequential)
            .await
            .unwrap();

        let node = path(&full);
        let watch = observer.watch_removal(&node).await.unwrap();
        ensemble.expire_session(owner.session_id());
        watch.removed().await;

        assert!(observer.exists(&node).await.unwrap().is_none());
        // Persistent nodes survive the session.
        assert!(observer.exists(&path("/xlock")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_session_rejects_further_calls() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        ensemble.expire_session(session.session_id());
        let err = session.children(&path("/")).await.unwrap_err();
        assert_eq!(err, CoordinationError::Expired);
    }

    #[tokio::test]
    async fn scripted_fault_fails_one_call() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        ensemble.inject_fault(OpKind::Children, Fault::fail(CoordinationError::ConnectionLoss));

        let err = session.children(&path("/")).await.unwrap_err();
        assert_eq!(err, CoordinationError::ConnectionLoss);
        assert!(session.children(&path("/")).await.is_ok());
    }

    #[tokio::test]
    async fn ack_lost_create_lands_despite_the_error() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session
            .create(&path("/xlock"), CreateMode::Persistent)
            .await
            .unwrap();
        ensemble.inject_fault(OpKind::Create, Fault::ack_lost(CoordinationError::ConnectionLoss));

        let err = session
            .create(&path("/xlock/x-1-"), CreateMode::EphemeralSequential)
            .await
            .unwrap_err();
        assert_eq!(err, CoordinationError::ConnectionLoss);

        let children = session.children(&path("/xlock")).await.unwrap();
        assert_eq!(children, vec!["x-1-0000000001"]);
    }
}
