//! Retry and suspension primitives for the replication daemon.
//!
//! The engine never gives up on an unreachable remote: it probes with
//! [`await_connectivity`] at a fixed interval until the store answers
//! or a stop is requested. There is no backoff and no attempt cap; the
//! pacing is the policy.
//!
//! | Preset                    | Interval | Used for                    |
//! |---------------------------|----------|-----------------------------|
//! | [`RetryPolicy::connect`]  | 30s      | Daemon connectivity probing |
//! | [`RetryPolicy::testing`]  | 10ms     | Unit tests                  |
//!
//! All waiting goes through [`suspend`], which races the timer against
//! the engine's stop signal so a shutdown never has to ride out a full
//! interval.

use crate::error::{ReplicationError, Result};
use crate::metrics;
use crate::store::TimeSeriesStore;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Fixed-interval retry pacing.
///
/// Deliberately has no attempt cap: the daemon's answer to a missing
/// remote is to wait, not to die.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
}

impl RetryPolicy {
    /// Policy with an explicit interval between attempts.
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// Production connectivity probing: one attempt every 30 seconds.
    pub fn connect() -> Self {
        Self::fixed(Duration::from_secs(30))
    }

    /// Fast pacing for tests.
    pub fn testing() -> Self {
        Self::fixed(Duration::from_millis(10))
    }

    /// Delay between consecutive attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::connect()
    }
}

/// Sleep for `duration`, waking early if a stop is requested.
///
/// The stop channel is a latch: any observed signal (or a closed
/// sender) means the engine is going down, so this returns
/// `Err(Shutdown)` rather than finishing the wait. Returns `Ok(())`
/// when the full duration elapsed undisturbed.
pub async fn suspend(duration: Duration, stop: &mut watch::Receiver<bool>) -> Result<()> {
    if *stop.borrow() {
        return Err(ReplicationError::Shutdown);
    }
    tokio::select! {
        biased;
        _ = stop.changed() => Err(ReplicationError::Shutdown),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Block until `store` answers a ping, pacing attempts with `policy`.
///
/// Returns the store's version string on success. Retryable failures
/// are logged and waited out indefinitely; a non-retryable failure or
/// a stop request ends the wait immediately.
pub async fn await_connectivity<S: TimeSeriesStore>(
    store: &S,
    policy: &RetryPolicy,
    stop: &mut watch::Receiver<bool>,
) -> Result<String> {
    let mut attempt: u64 = 0;
    loop {
        match store.ping().await {
            Ok(version) => return Ok(version),
            Err(e) if e.is_retryable() => {
                attempt += 1;
                warn!(attempt, error = %e, "store unreachable, retrying");
                metrics::record_connectivity_retry();
                suspend(policy.interval(), stop).await?;
            }
            Err(e) => return Err(e),
        }
    }
}
