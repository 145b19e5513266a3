//! Retry policy for per-identifier fetches

use std::time::Duration;

/// Base step of the linear backoff
pub const BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Linear backoff: 0.5s × attempt (attempt is 1-indexed: 0.5s, 1s, 1.5s, ...)
pub const fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_STEP.as_millis() as u64 * attempt as u64)
}

/// Bounded attempt budget with linear backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per identifier (not "retries after the first")
    pub max_retries: u32,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Attempt numbers, 1-indexed
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_retries
    }

    /// Sleep before the next attempt after `attempt` failed.
    pub async fn wait(&self, label: &str, attempt: u32, reason: &str) {
        let delay = backoff_delay(attempt);
        log::debug!(
            "{label}: attempt {attempt}/{} failed: {reason}, retrying in {delay:?}",
            self.max_retries
        );
        tokio::time::sleep(delay).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}
