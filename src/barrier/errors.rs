//! Barrier Error Types
//!
//! A barrier that cannot be confirmed is an explicit failure. The caller must
//! read every "unconfirmed" error as "commit/quorum could not be confirmed",
//! never as "operation definitely failed": the write may well have been
//! applied at the storage layer.

use std::fmt;

use crate::response::{StatusCode, SubStatusCode};

/// Barrier error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierError {
    /// Error kind
    pub kind: BarrierErrorKind,
    /// Error message
    pub message: String,
}

/// Barrier error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierErrorKind {
    /// Attempt budget exhausted without observing the required global
    /// committed LSN
    BarrierNotMet,

    /// Overall request deadline elapsed
    Timeout,

    /// Caller cancelled the operation
    Cancelled,

    /// Attempt budget exhausted after failing over across regions
    ServiceUnavailable,

    /// Response is missing or carries unparseable consistency headers
    MalformedResponse,

    /// Non-retriable status returned by the transport
    Transport {
        status: StatusCode,
        sub_status: SubStatusCode,
    },
}

impl BarrierError {
    /// Create a new barrier error.
    pub fn new(kind: BarrierErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a barrier-not-met error.
    pub fn barrier_not_met(message: impl Into<String>) -> Self {
        Self::new(BarrierErrorKind::BarrierNotMet, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BarrierErrorKind::Timeout, message)
    }

    /// Create a cancelled error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(BarrierErrorKind::Cancelled, message)
    }

    /// Create a service unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(BarrierErrorKind::ServiceUnavailable, message)
    }

    /// Create a malformed response error.
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(BarrierErrorKind::MalformedResponse, message)
    }

    /// Create a transport error carrying the offending status.
    pub fn transport(status: StatusCode, sub_status: SubStatusCode, message: impl Into<String>) -> Self {
        Self::new(BarrierErrorKind::Transport { status, sub_status }, message)
    }

    /// Status code surfaced to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            BarrierErrorKind::BarrierNotMet => StatusCode::GONE,
            BarrierErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            BarrierErrorKind::Cancelled => StatusCode::REQUEST_TIMEOUT,
            BarrierErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            BarrierErrorKind::MalformedResponse => StatusCode::GONE,
            BarrierErrorKind::Transport { status, .. } => status,
        }
    }

    /// The operation may have been applied; only its global commit could not
    /// be confirmed.
    pub fn is_commit_unconfirmed(&self) -> bool {
        !matches!(self.kind, BarrierErrorKind::Transport { .. })
    }

    /// Check if this error was surfaced without any barrier retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            BarrierErrorKind::MalformedResponse | BarrierErrorKind::Transport { .. }
        )
    }
}

impl fmt::Display for BarrierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BarrierError({:?}, status {}): {}",
            self.kind,
            self.status_code(),
            self.message
        )
    }
}

impl std::error::Error for BarrierError {}

/// Result type for barrier operations
pub type BarrierResult<T> = Result<T, BarrierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_statuses() {
        assert_eq!(BarrierError::barrier_not_met("x").status_code(), StatusCode::GONE);
        assert_eq!(BarrierError::timeout("x").status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(BarrierError::cancelled("x").status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            BarrierError::service_unavailable("x").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_unconfirmed_errors() {
        assert!(BarrierError::barrier_not_met("x").is_commit_unconfirmed());
        assert!(BarrierError::timeout("x").is_commit_unconfirmed());
        assert!(BarrierError::service_unavailable("x").is_commit_unconfirmed());
        assert!(BarrierError::malformed_response("x").is_commit_unconfirmed());

        let auth = BarrierError::transport(StatusCode::UNAUTHORIZED, SubStatusCode::UNKNOWN, "x");
        assert!(!auth.is_commit_unconfirmed());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(BarrierError::malformed_response("x").is_fatal());
        assert!(
            BarrierError::transport(StatusCode::INTERNAL_SERVER_ERROR, SubStatusCode::UNKNOWN, "x")
                .is_fatal()
        );
        assert!(!BarrierError::barrier_not_met("x").is_fatal());
        assert!(!BarrierError::timeout("x").is_fatal());
    }

    #[test]
    fn test_transport_status_passthrough() {
        let err = BarrierError::transport(StatusCode::FORBIDDEN, SubStatusCode::new(5), "denied");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.to_string().contains("denied"));
        assert!(err.to_string().contains("403"));
    }
}
