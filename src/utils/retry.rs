use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Retry with linear backoff
// ============================================================================
//
// Used at startup while dependencies (Postgres) are still coming up:
// attempt n waits `step * n` before attempt n + 1, capped at `max_delay`.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            step: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached,
/// returning the last error in the latter case.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, what: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(what, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if attempt >= policy.max_attempts => {
                tracing::error!(what, attempt, error = %error, "Giving up after all retries");
                return Err(error);
            }
            Err(error) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    what,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}
