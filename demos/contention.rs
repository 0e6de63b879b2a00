//! Example: several workers queueing on one lock in wait mode
//!
//! Run with: `cargo run --example contention`

use cronlock::{
    AcquireOutcome, BlockedBehavior, LockPath, MemoryEnsemble, SequenceLock, SequenceLockOptions,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ensemble = MemoryEnsemble::new();
    let path = LockPath::parse("/jobs/shared-task")?;

    let mut workers = Vec::new();
    for worker in 1..=3u32 {
        let ensemble = ensemble.clone();
        let path = path.clone();
        workers.push(tokio::spawn(async move {
            let options = SequenceLockOptions {
                blocked: BlockedBehavior::Wait,
                ..Default::default()
            };
            let lock = SequenceLock::with_options(ensemble.connect(), path, options);

            match lock.acquire(Some(Duration::from_secs(10))).await {
                Ok(AcquireOutcome::Held(guard)) => {
                    println!("worker {worker} holds the lock as {}", guard.candidate());
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    guard.release().await.expect("release");
                    println!("worker {worker} released");
                }
                Ok(AcquireOutcome::Blocked { .. }) => {
                    unreachable!("wait mode never reports")
                }
                Err(err) => eprintln!("worker {worker} failed: {err}"),
            }
        }));
    }

    for worker in workers {
        worker.await?;
    }
    println!("all workers ran exactly once, one at a time");

    Ok(())
}
