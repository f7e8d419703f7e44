//! Bounded exponential backoff for transient failures.

use crate::defaults;
use crate::resilience::classify::FailureKind;
use std::time::Duration;
use tokio::time::sleep;

pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` total attempts (including the
    /// first) with default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(defaults::RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(defaults::RETRY_MAX_DELAY_MS),
        }
    }

    /// Whether another attempt is warranted after `attempt` failed.
    ///
    /// Only transient kinds (connection, timeout) are retried here; the
    /// recovery table handles the other kinds with their own strategies.
    pub fn should_retry(&self, attempt: u32, kind: FailureKind) -> bool {
        attempt < self.max_attempts && kind.is_transient()
    }

    /// Delay before the attempt following `attempt`: base * 2^(attempt-1),
    /// capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let multiplier = 2u64.saturating_pow(exponent);
        let delay_ms = (self.base_delay.as_millis() as u64).saturating_mul(multiplier);
        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    /// Sleeps out the backoff after a failed attempt.
    pub async fn wait(&self, attempt: u32) {
        let delay = self.delay_for(attempt);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retry backoff");
        sleep(delay).await;
    }
}
