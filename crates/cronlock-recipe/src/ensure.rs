//! Lock-directory creation, idempotent and retry-tolerant.

use cronlock_core::error::{CoordinationError, LockError, LockResult};
use cronlock_core::path::LockPath;
use cronlock_core::retry::RetryPolicy;
use cronlock_core::session::{CoordinationSession, CreateMode};
use tracing::debug;

/// Guarantees the lock directory exists before any candidate is created.
///
/// Probes for the path and, when absent, creates every missing ancestor
/// root-down as persistent nodes, finishing with the leaf. A racing
/// creator's `NodeExists` is success at every level. One attempt budget
/// covers the whole probe/create walk: connection loss on any call sleeps
/// the policy delay and re-runs the walk. The nodes are never deleted by
/// this system.
pub async fn ensure_lock_path<S: CoordinationSession>(
    session: &S,
    path: &LockPath,
    policy: &RetryPolicy,
) -> LockResult<()> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match probe_and_create(session, path).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_transient() => {
                if attempts >= policy.max_attempts {
                    return Err(LockError::RetriesExhausted {
                        attempts,
                        source: err,
                    });
                }
                debug!(path = %path, attempt = attempts, "connection loss to the server");
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(LockError::Session(err)),
        }
    }
}

async fn probe_and_create<S: CoordinationSession>(
    session: &S,
    path: &LockPath,
) -> Result<(), CoordinationError> {
    if session.exists(path).await?.is_some() {
        return Ok(());
    }
    for ancestor in ancestry(path) {
        match session.create(&ancestor, CreateMode::Persistent).await {
            Ok(_) => debug!(path = %ancestor, "lock directory created"),
            Err(CoordinationError::NodeExists(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// The path and its ancestors, ordered root-down, root excluded.
fn ancestry(path: &LockPath) -> Vec<LockPath> {
    let mut chain = vec![path.clone()];
    let mut current = path.clone();
    while let Some(parent) = current.parent() {
        if parent.as_str() == "/" {
            break;
        }
        chain.push(parent.clone());
        current = parent;
    }
    chain.reverse();
    chain
}
