//! External call failures and their classification

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure class of one external call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The attempt exceeded the call timeout
    Timeout,
    /// The provider asked us to slow down (HTTP 429)
    RateLimited,
    /// Transient provider-side failure (HTTP 5xx)
    ServerError,
    /// Connection refused, reset or dropped
    Connection,
    /// The provider rejected the request itself (HTTP 400)
    MalformedRequest,
    /// Credentials missing or rejected (HTTP 401/403)
    Authentication,
    /// The response arrived but could not be parsed
    Parse,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited | Self::ServerError | Self::Connection
        )
    }

    /// Classify an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            408 => Self::Timeout,
            429 => Self::RateLimited,
            400 | 404 | 413 | 422 => Self::MalformedRequest,
            401 | 403 => Self::Authentication,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::Connection => "connection",
            Self::MalformedRequest => "malformed_request",
            Self::Authentication => "authentication",
            Self::Parse => "parse",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// One failed external call attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ExternalError {
    /// Failure class
    pub kind: FailureKind,
    /// Provider or transport message
    pub message: String,
}

impl ExternalError {
    /// Create an error of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Attempt timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    /// Provider rate limit.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, message)
    }

    /// Provider-side failure.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ServerError, message)
    }

    /// Response could not be parsed.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Parse, message)
    }

    /// Whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<crate::llm::ParseError> for ExternalError {
    fn from(err: crate::llm::ParseError) -> Self {
        Self::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FailureKind::Timeout.is_retryable());
        assert!(FailureKind::RateLimited.is_retryable());
        assert!(FailureKind::ServerError.is_retryable());
        assert!(FailureKind::Connection.is_retryable());
        assert!(!FailureKind::MalformedRequest.is_retryable());
        assert!(!FailureKind::Authentication.is_retryable());
        assert!(!FailureKind::Parse.is_retryable());
        assert!(!FailureKind::Other.is_retryable());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(FailureKind::from_status(429), FailureKind::RateLimited);
        assert_eq!(FailureKind::from_status(503), FailureKind::ServerError);
        assert_eq!(FailureKind::from_status(401), FailureKind::Authentication);
        assert_eq!(FailureKind::from_status(400), FailureKind::MalformedRequest);
        assert_eq!(FailureKind::from_status(302), FailureKind::Other);
    }

    #[test]
    fn test_display() {
        let err = ExternalError::rate_limited("slow down");
        assert_eq!(err.to_string(), "rate_limited: slow down");
    }
}
