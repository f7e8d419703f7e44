//! Failure classification for external-service calls.
//!
//! Every error coming back from the speech-recognition or translation
//! service is mapped onto a small taxonomy; the recovery table in
//! [`super::client`] keys off the kind, never the message.

use serde::Serialize;
use thiserror::Error;

/// The two external services wrapped by the resilience layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceId {
    SpeechRecognition,
    Translation,
}

impl ServiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::SpeechRecognition => "speech-recognition",
            ServiceId::Translation => "translation",
        }
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy for classified service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Could not reach the service at all.
    Connection,
    /// The service did not answer in time.
    Timeout,
    /// The service answered but reported itself unavailable.
    ServiceUnavailable,
    /// The service is out of memory, quota, or similar capacity.
    Resource,
    /// Authentication or authorization failure.
    Permission,
    /// The request or response payload was malformed.
    Format,
    /// The request referenced an unknown model, endpoint, or parameter.
    Configuration,
}

impl FailureKind {
    /// Kinds worth a plain retry of the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Connection | FailureKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connection => "connection",
            FailureKind::Timeout => "timeout",
            FailureKind::ServiceUnavailable => "service_unavailable",
            FailureKind::Resource => "resource",
            FailureKind::Permission => "permission",
            FailureKind::Format => "format",
            FailureKind::Configuration => "configuration",
        }
    }
}

/// A classified failure from one of the external services.
#[derive(Error, Debug, Clone)]
#[error("{service}: {} failure: {message}", kind.as_str())]
pub struct ServiceError {
    pub service: ServiceId,
    pub kind: FailureKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(service: ServiceId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    /// Error returned when an open circuit breaker rejects a call without
    /// touching the service.
    pub fn short_circuit(service: ServiceId) -> Self {
        Self::new(
            service,
            FailureKind::ServiceUnavailable,
            "circuit breaker open",
        )
    }

    /// True when this error came from the breaker, not the service.
    pub fn is_short_circuit(&self) -> bool {
        self.kind == FailureKind::ServiceUnavailable && self.message == "circuit breaker open"
    }

    /// Classifies a transport-level reqwest error.
    pub fn from_transport(service: ServiceId, error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            FailureKind::Timeout
        } else if error.is_connect() {
            FailureKind::Connection
        } else if error.is_decode() {
            FailureKind::Format
        } else {
            FailureKind::Connection
        };
        Self::new(service, kind, error.to_string())
    }

    /// Classifies a non-success HTTP status from a service response.
    pub fn from_status(service: ServiceId, status: reqwest::StatusCode, body: &str) -> Self {
        use reqwest::StatusCode;

        let kind = match status {
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                FailureKind::ServiceUnavailable
            }
            StatusCode::TOO_MANY_REQUESTS | StatusCode::INSUFFICIENT_STORAGE => {
                FailureKind::Resource
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::Permission,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => FailureKind::Format,
            StatusCode::NOT_FOUND => FailureKind::Configuration,
            StatusCode::GATEWAY_TIMEOUT => FailureKind::Timeout,
            _ => FailureKind::ServiceUnavailable,
        };
        Self::new(service, kind, format!("HTTP {}: {}", status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_id_display() {
        assert_eq!(ServiceId::SpeechRecognition.to_string(), "speech-recognition");
        assert_eq!(ServiceId::Translation.to_string(), "translation");
    }

    #[test]
    fn test_transient_kinds() {
        assert!(FailureKind::Connection.is_transient());
        assert!(FailureKind::Timeout.is_transient());
        assert!(!FailureKind::ServiceUnavailable.is_transient());
        assert!(!FailureKind::Format.is_transient());
        assert!(!FailureKind::Configuration.is_transient());
    }

    #[test]
    fn test_short_circuit_marker() {
        let error = ServiceError::short_circuit(ServiceId::Translation);
        assert!(error.is_short_circuit());
        assert_eq!(error.kind, FailureKind::ServiceUnavailable);

        let other = ServiceError::new(
            ServiceId::Translation,
            FailureKind::ServiceUnavailable,
            "503 from upstream",
        );
        assert!(!other.is_short_circuit());
    }

    #[test]
    fn test_status_classification() {
        let cases = [
            (reqwest::StatusCode::SERVICE_UNAVAILABLE, FailureKind::ServiceUnavailable),
            (reqwest::StatusCode::TOO_MANY_REQUESTS, FailureKind::Resource),
            (reqwest::StatusCode::UNAUTHORIZED, FailureKind::Permission),
            (reqwest::StatusCode::BAD_REQUEST, FailureKind::Format),
            (reqwest::StatusCode::NOT_FOUND, FailureKind::Configuration),
            (reqwest::StatusCode::GATEWAY_TIMEOUT, FailureKind::Timeout),
        ];
        for (status, expected) in cases {
            let error = ServiceError::from_status(ServiceId::SpeechRecognition, status, "");
            assert_eq!(error.kind, expected, "status {}", status);
        }
    }

    #[test]
    fn test_error_display() {
        let error = ServiceError::new(
            ServiceId::SpeechRecognition,
            FailureKind::Timeout,
            "deadline exceeded",
        );
        assert_eq!(
            error.to_string(),
            "speech-recognition: timeout failure: deadline exceeded"
        );
    }
}
