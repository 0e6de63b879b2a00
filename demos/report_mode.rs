//! Example: the cron-job pattern — report and yield when blocked
//!
//! Run with: `cargo run --example report_mode`

use cronlock::{AcquireOutcome, LockPath, MemoryEnsemble, SequenceLock};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ensemble = MemoryEnsemble::new();
    let path = LockPath::parse("/jobs/nightly-report")?;

    // A rival process already holds the lock.
    let rival = SequenceLock::new(ensemble.connect(), path.clone());
    let rival_guard = match rival.acquire(None).await? {
        AcquireOutcome::Held(guard) => guard,
        AcquireOutcome::Blocked { .. } => unreachable!("first candidate in"),
    };
    println!("rival holds the lock as {}", rival_guard.candidate());

    // Our process reports its predecessor and yields this run, exactly
    // like a cron job that finds another host already working.
    let ours = SequenceLock::new(ensemble.connect(), path.clone());
    match ours.acquire(Some(Duration::from_secs(5))).await? {
        AcquireOutcome::Held(guard) => {
            println!("unexpectedly held the lock");
            guard.release().await?;
        }
        AcquireOutcome::Blocked { predecessor } => {
            println!("LOCKED: {}", path.join(predecessor.name())?);
        }
    }

    // Once the rival releases, a fresh attempt succeeds.
    rival_guard.release().await?;
    let retry = SequenceLock::new(ensemble.connect(), path.clone());
    if let AcquireOutcome::Held(guard) = retry.acquire(Some(Duration::from_secs(5))).await? {
        println!("acquired after release as {}", guard.candidate());
        guard.release().await?;
    }

    Ok(())
}
