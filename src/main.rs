//! `cronlock` — run-once coordination for distributed cron jobs.
//!
//! Exit code 0 covers normal completion, including the observed-as-locked
//! path; non-zero means an unrecoverable coordination failure.

use std::process;
use std::time::Duration;

use clap::Parser;
use cronlock_core::path::LockPath;
use cronlock_core::retry::RetryPolicy;
use cronlock_core::sequence::session_prefix;
use cronlock_core::session::CoordinationSession;
use cronlock_memory::MemoryEnsemble;
use cronlock_recipe::{
    ensure_lock_path, register_or_find, AcquireOutcome, BlockedBehavior, SequenceLock,
    SequenceLockOptions,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cronlock", version, about)]
struct Cli {
    /// Coordination-service endpoints. This build supports the in-process
    /// `mem://` scheme.
    endpoints: String,

    /// Lock directory, e.g. `/jobs/nightly-report`.
    lock_path: String,

    /// Seconds to hold the lock before releasing.
    #[arg(long, default_value_t = 10)]
    hold: u64,

    /// Wait for the predecessor instead of reporting and exiting.
    #[arg(long)]
    wait: bool,

    /// Retry budget for transient coordination failures.
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Delay between retries, in microseconds.
    #[arg(long, default_value_t = 500)]
    retry_delay_us: u64,

    /// Overall acquisition timeout in seconds.
    #[arg(long)]
    acquire_timeout: Option<u64>,

    /// Pre-register this many competing sessions (simulation aid for the
    /// in-process service).
    #[arg(long, default_value_t = 0)]
    contenders: u32,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        error!(error = %err, "unrecoverable failure");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.endpoints.strip_prefix("mem://").is_none() {
        return Err(format!(
            "unsupported endpoint scheme in {:?}: this build speaks mem:// only",
            cli.endpoints
        )
        .into());
    }

    let path = LockPath::parse(&cli.lock_path)?;
    let options = SequenceLockOptions {
        retry: RetryPolicy {
            max_attempts: cli.max_retries,
            delay: Duration::from_micros(cli.retry_delay_us),
        },
        blocked: if cli.wait {
            BlockedBehavior::Wait
        } else {
            BlockedBehavior::Report
        },
    };

    let ensemble = MemoryEnsemble::new();

    // Rival sessions register candidates ahead of ours and stay alive for
    // the duration of the run, so the blocked path is exercisable end to
    // end against the in-process service.
    let mut rivals = Vec::new();
    for _ in 0..cli.contenders {
        let session = ensemble.connect();
        ensure_lock_path(&session, &path, &options.retry).await?;
        let prefix = session_prefix(session.session_id());
        register_or_find(&session, &path, &prefix, &options.retry).await?;
        rivals.push(session);
    }

    let session = ensemble.connect();
    let lock = SequenceLock::with_options(session, path.clone(), options);

    let timeout = cli.acquire_timeout.map(Duration::from_secs);
    match lock.acquire(timeout).await? {
        AcquireOutcome::Held(guard) => {
            info!(candidate = %guard.candidate(), path = %path, "lock acquired");
            tokio::time::sleep(Duration::from_secs(cli.hold)).await;
            guard.release().await?;
        }
        AcquireOutcome::Blocked { predecessor } => {
            // Naming convention inherited from the recipe, kept for
            // compatibility with existing cron wrappers.
            println!("LOCKED: {}", path.join(predecessor.name())?);
        }
    }

    Ok(())
}
