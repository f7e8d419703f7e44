//! Per-service circuit breaker.
//!
//! A small tagged state machine (closed / open / half-open). The owner calls
//! [`CircuitBreaker::try_acquire`] before a service call and reports the
//! outcome; there is exactly one owner per service, so half-open admits at
//! most one trial call by construction.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Breaker state, tagged with the open timestamp where relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are short-circuited until the cool-down elapses.
    Open { opened_at: Instant },
    /// One trial call is permitted; its outcome decides the next state.
    HalfOpen,
}

/// State discriminant without timestamps, for events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitStateKind {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitStateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitStateKind::Closed => "closed",
            CircuitStateKind::Open => "open",
            CircuitStateKind::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            threshold: threshold.max(1),
            cooldown,
        }
    }

    /// Current state discriminant.
    pub fn kind(&self) -> CircuitStateKind {
        match self.state {
            CircuitState::Closed => CircuitStateKind::Closed,
            CircuitState::Open { .. } => CircuitStateKind::Open,
            CircuitState::HalfOpen => CircuitStateKind::HalfOpen,
        }
    }

    /// Whether a call would currently be admitted, without changing state.
    ///
    /// Used by the translation loop to decide fallback mode before pulling a
    /// sentence off the queue.
    pub fn would_allow(&self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open { opened_at } => opened_at.elapsed() >= self.cooldown,
        }
    }

    /// Requests permission for one call.
    ///
    /// An open breaker whose cool-down has elapsed transitions to half-open
    /// and admits the trial call.
    pub fn try_acquire(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.cooldown {
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Records a successful call: resets the failure count and closes.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = CircuitState::Closed;
    }

    /// Records a failed call.
    ///
    /// In half-open the breaker reopens immediately and the cool-down
    /// restarts; when closed, reaching the threshold opens it.
    pub fn record_failure(&mut self) {
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open {
                    opened_at: Instant::now(),
                };
            }
            CircuitState::Closed => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= self.threshold {
                    self.state = CircuitState::Open {
                        opened_at: Instant::now(),
                    };
                }
            }
            CircuitState::Open { .. } => {}
        }
    }

    /// Forces an open breaker straight to half-open, skipping the remaining
    /// cool-down. Backs the user-facing "retry connection" action.
    pub fn force_trial(&mut self) {
        if matches!(self.state, CircuitState::Open { .. }) {
            self.state = CircuitState::HalfOpen;
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CircuitState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(threshold, Duration::from_millis(cooldown_ms))
    }

    #[test]
    fn test_starts_closed() {
        let b = breaker(5, 30_000);
        assert_eq!(b.kind(), CircuitStateKind::Closed);
        assert!(b.would_allow());
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let mut b = breaker(5, 30_000);
        for _ in 0..4 {
            b.record_failure();
            assert_eq!(b.kind(), CircuitStateKind::Closed);
        }
        b.record_failure();
        assert_eq!(b.kind(), CircuitStateKind::Open);
        assert!(!b.would_allow());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let mut b = breaker(3, 30_000);
        b.record_failure();
        b.record_failure();
        b.record_success();
        b.record_failure();
        b.record_failure();
        assert_eq!(b.kind(), CircuitStateKind::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_short_circuits_until_cooldown() {
        let mut b = breaker(1, 1000);
        b.record_failure();
        assert_eq!(b.kind(), CircuitStateKind::Open);
        assert!(!b.try_acquire());

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!b.try_acquire());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(b.try_acquire());
        assert_eq!(b.kind(), CircuitStateKind::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_success_closes() {
        let mut b = breaker(1, 1000);
        b.record_failure();
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(b.try_acquire());

        b.record_success();
        assert_eq!(b.kind(), CircuitStateKind::Closed);
        assert!(b.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_and_restarts_cooldown() {
        let mut b = breaker(1, 1000);
        b.record_failure();
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(b.try_acquire());

        b.record_failure();
        assert_eq!(b.kind(), CircuitStateKind::Open);

        // Cool-down restarted, not continued.
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!b.try_acquire());
        tokio::time::advance(Duration::from_millis(501)).await;
        assert!(b.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_trial_skips_cooldown() {
        let mut b = breaker(1, 60_000);
        b.record_failure();
        assert!(!b.would_allow());

        b.force_trial();
        assert_eq!(b.kind(), CircuitStateKind::HalfOpen);
        assert!(b.try_acquire());
    }

    #[test]
    fn test_force_trial_is_noop_when_closed() {
        let mut b = breaker(5, 1000);
        b.force_trial();
        assert_eq!(b.kind(), CircuitStateKind::Closed);
    }
}
