//! Resilient call wrapper combining classification, the recovery table, and
//! the per-service circuit breaker.
//!
//! Every external call made by the transcription and translation loops goes
//! through [`ResilientClient::call`]. Recovery strategies by failure kind:
//!
//! - connection / timeout: bounded exponential-backoff retry
//! - service_unavailable: no retry; counts toward the breaker
//! - resource: one retry with `reduced_quality` set
//! - configuration: one retry with `use_defaults` set, one-time warning
//! - format / permission: fail immediately

use crate::config::SessionOptions;
use crate::events::{EventSender, PipelineEvent};
use crate::resilience::breaker::{CircuitBreaker, CircuitStateKind};
use crate::resilience::classify::{FailureKind, ServiceError, ServiceId};
use crate::resilience::retry::RetryPolicy;
use std::future::Future;
use std::time::Duration;

/// Parameters for one attempt of an operation.
///
/// The operation closure receives these and adjusts its request accordingly;
/// the client never inspects requests itself.
#[derive(Debug, Clone, Copy)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Use the smaller/faster variant of the request (resource recovery).
    pub reduced_quality: bool,
    /// Drop custom parameters and use known-good defaults (configuration
    /// recovery).
    pub use_defaults: bool,
}

impl Attempt {
    fn first() -> Self {
        Self {
            number: 1,
            reduced_quality: false,
            use_defaults: false,
        }
    }
}

pub struct ResilientClient {
    service: ServiceId,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    events: EventSender,
    last_state: CircuitStateKind,
    defaults_warned: bool,
}

impl ResilientClient {
    pub fn new(service: ServiceId, options: &SessionOptions, events: EventSender) -> Self {
        Self {
            service,
            breaker: CircuitBreaker::new(
                options.circuit_breaker_threshold,
                Duration::from_millis(options.circuit_breaker_cooldown_ms),
            ),
            retry: RetryPolicy::new(options.max_retries),
            events,
            last_state: CircuitStateKind::Closed,
            defaults_warned: false,
        }
    }

    /// Whether the breaker would admit a call right now.
    pub fn available(&self) -> bool {
        self.breaker.would_allow()
    }

    /// Current breaker state.
    pub fn breaker_state(&self) -> CircuitStateKind {
        self.breaker.kind()
    }

    /// Skips the remaining cool-down so the next call performs the trial.
    pub fn force_trial(&mut self) {
        self.breaker.force_trial();
        self.publish_state();
    }

    /// Runs `op` with classification-driven recovery and breaker accounting.
    ///
    /// `op` is invoked with an [`Attempt`] describing what this try should
    /// look like; it must return a fresh future per invocation.
    pub async fn call<T, F, Fut>(&mut self, mut op: F) -> Result<T, ServiceError>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        if !self.breaker.try_acquire() {
            tracing::debug!(service = %self.service, "short-circuited by open breaker");
            return Err(ServiceError::short_circuit(self.service));
        }
        self.publish_state();

        let mut attempt = Attempt::first();
        let mut resource_retry_used = false;
        let mut defaults_retry_used = false;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    self.breaker.record_success();
                    self.publish_state();
                    return Ok(value);
                }
                Err(error) => {
                    tracing::warn!(
                        service = %self.service,
                        kind = error.kind.as_str(),
                        attempt = attempt.number,
                        "service call failed: {}",
                        error.message
                    );
                    self.breaker.record_failure();
                    self.publish_state();

                    // Once the breaker leaves closed there is no budget left
                    // for further attempts inside this call.
                    if !self.breaker.is_closed() {
                        return Err(error);
                    }

                    match error.kind {
                        kind if self.retry.should_retry(attempt.number, kind) => {
                            self.retry.wait(attempt.number).await;
                            attempt.number += 1;
                        }
                        FailureKind::Resource if !resource_retry_used => {
                            resource_retry_used = true;
                            attempt.reduced_quality = true;
                            attempt.number += 1;
                        }
                        FailureKind::Configuration if !defaults_retry_used => {
                            if !self.defaults_warned {
                                tracing::warn!(
                                    service = %self.service,
                                    "configuration failure; retrying with known-good defaults"
                                );
                                self.defaults_warned = true;
                            }
                            defaults_retry_used = true;
                            attempt.use_defaults = true;
                            attempt.number += 1;
                        }
                        _ => return Err(error),
                    }
                }
            }
        }
    }

    fn publish_state(&mut self) {
        let state = self.breaker.kind();
        if state != self.last_state {
            tracing::info!(service = %self.service, %state, "circuit breaker state changed");
            self.last_state = state;
            self.events.emit(PipelineEvent::CircuitBreakerStateChanged {
                service: self.service,
                state,
            });
        }
    }
}
