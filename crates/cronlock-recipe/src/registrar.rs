//! Candidate registration, exactly once per session.

use cronlock_core::error::{LockError, LockResult};
use cronlock_core::path::LockPath;
use cronlock_core::retry::{with_retry, RetryPolicy};
use cronlock_core::sequence::Candidate;
use cronlock_core::session::{CoordinationSession, CreateMode};
use tracing::debug;

/// Creates, or discovers, this session's candidate entry under `path`.
///
/// Enumeration runs first: a sibling carrying our `prefix` means a prior
/// create already landed (its acknowledgement may have died with the
/// connection), and that entry is returned unchanged. Only when no such
/// sibling exists is one ephemeral sequential entry created.
///
/// The create call itself is never retried — retrying it could leave two
/// live candidates for one session. When it fails the whole protocol pass
/// fails, and the next pass's enumeration discovers the entry if the
/// create landed despite the reported failure. As long as the search
/// precedes every create, at most one candidate exists per live session
/// per lock path.
pub async fn register_or_find<S: CoordinationSession>(
    session: &S,
    path: &LockPath,
    prefix: &str,
    policy: &RetryPolicy,
) -> LockResult<Candidate> {
    let siblings = with_retry(policy, "children", || session.children(path)).await?;

    if let Some(existing) = siblings.iter().find(|name| name.starts_with(prefix)) {
        debug!(candidate = %existing, "found existing candidate for this session");
        return Candidate::parse(existing);
    }

    let requested = path.join(prefix).map_err(LockError::Session)?;
    let assigned = session
        .create(&requested, CreateMode::EphemeralSequential)
        .await
        .map_err(LockError::Session)?;

    // The service returns the full assigned path; the candidate is its
    // last component.
    let name = assigned.rsplit('/').next().unwrap_or(&assigned);
    debug!(candidate = %name, "candidate created");
    Candidate::parse(name)
}
