//! Bounded retry with fixed delay for coordination-service calls.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{CoordinationError, LockError, LockResult};

/// Retry budget for transient failures: at most `max_attempts` calls, with
/// a fixed `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_micros(500),
        }
    }
}

/// Runs `op`, re-attempting on transient errors up to the policy's budget.
///
/// Transient errors (connection loss) sleep the fixed delay and re-attempt;
/// exhausting the budget yields [`LockError::RetriesExhausted`]. Everything
/// else returns after exactly one attempt — the caller chooses the
/// corrective action (e.g. create on `NoNode`) or aborts.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> LockResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoordinationError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if attempts >= policy.max_attempts {
                    return Err(LockError::RetriesExhausted {
                        attempts,
                        source: err,
                    });
                }
                debug!(op = op_name, attempt = attempts, "connection loss to the server");
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(LockError::Session(err)),
        }
    }
}
