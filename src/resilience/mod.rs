//! Resilience layer wrapping every external-service call.
//!
//! Failures are classified into a small taxonomy, recovered according to a
//! fixed table, and accounted against a per-service circuit breaker.

pub mod breaker;
pub mod classify;
pub mod client;
pub mod retry;

pub use breaker::{CircuitBreaker, CircuitState, CircuitStateKind};
pub use classify::{FailureKind, ServiceError, ServiceId};
pub use client::{Attempt, ResilientClient};
pub use retry::RetryPolicy;
