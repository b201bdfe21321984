//! Retry a vendor call through throttling and transient failures.
//!
//! This is the outer wrapper that goes around an SDK call, not around a wait.
//! Only errors classified as [`ErrorKind::Retryable`] are retried. The wait
//! between attempts grows linearly: `initial`, `initial + increment`, and so on.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{ApiError, ErrorClassifier, ErrorKind};

/// How long and how often to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Give up once another wait would reach this deadline.
    pub timeout: Duration,
    /// Wait after the first failure.
    pub initial_wait: Duration,
    /// Added to the wait after each further failure.
    pub increment: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            initial_wait: Duration::from_secs(3),
            increment: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            timeout: Duration::ZERO,
            initial_wait: Duration::ZERO,
            increment: Duration::ZERO,
        }
    }

    /// The wait after the `attempt`th failure (1-based).
    pub fn wait_for(&self, attempt: u32) -> Duration {
        self.initial_wait + self.increment * attempt.saturating_sub(1)
    }
}

/// Call `op` until it succeeds, fails with a non-retryable error, or the next
/// wait would reach the policy's deadline. The last error is returned on give-up,
/// so a zero timeout means exactly one attempt.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    classifier: &ErrorClassifier,
    action: &str,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let start = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if classifier.classify(&err) != ErrorKind::Retryable {
            return Err(err);
        }

        let wait = policy.wait_for(attempt);
        if start.elapsed() + wait >= policy.timeout {
            warn!(action, attempt, code = %err.code, "giving up after retries");
            return Err(err);
        }

        debug!(action, attempt, code = %err.code, ?wait, "retrying");
        sleep(wait).await;
    }
}
