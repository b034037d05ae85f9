//! Typed failure taxonomy for collaborator calls.

use std::time::Duration;

use thiserror::Error;

/// How the scheduler treats a failed collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Another instance of the bot holds the session. Terminates the process.
    FatalConflict,
    /// Transient transport trouble. Retried with backoff and counted by the breaker.
    RetryableTransport,
    /// Anything else. Propagated without retry.
    Unclassified,
}

impl ErrorKind {
    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FatalConflict => "fatal_conflict",
            ErrorKind::RetryableTransport => "retryable_transport",
            ErrorKind::Unclassified => "unclassified",
        }
    }
}

/// Errors raised by the response dispatcher or the delivery channel.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The platform reports a duplicate session for this bot.
    #[error("conflict: another instance is active ({0})")]
    Conflict(String),

    /// The connection dropped or never came up.
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    /// The transport failed internally (upstream 5xx and similar).
    #[error("transport error: {0}")]
    TransportFatal(String),

    /// The platform asked us to slow down.
    #[error("rate limited{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Any failure the relay has no specific handling for.
    #[error("{0}")]
    Other(String),
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Conflict(_) => ErrorKind::FatalConflict,
            DispatchError::ConnectionReset(_)
            | DispatchError::TransportFatal(_)
            | DispatchError::RateLimited { .. } => ErrorKind::RetryableTransport,
            DispatchError::Other(_) => ErrorKind::Unclassified,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        DispatchError::Other(message.into())
    }
}

/// Result type for collaborator calls.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            DispatchError::Conflict("409".into()).kind(),
            ErrorKind::FatalConflict
        );
        assert_eq!(
            DispatchError::ConnectionReset("reset by peer".into()).kind(),
            ErrorKind::RetryableTransport
        );
        assert_eq!(
            DispatchError::TransportFatal("502".into()).kind(),
            ErrorKind::RetryableTransport
        );
        assert_eq!(
            DispatchError::RateLimited { retry_after: None }.kind(),
            ErrorKind::RetryableTransport
        );
        assert_eq!(DispatchError::other("bad payload").kind(), ErrorKind::Unclassified);
    }

    #[test]
    fn test_error_display() {
        let err = DispatchError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.to_string(), "rate limited (retry after 7s)");
        assert_eq!(
            DispatchError::RateLimited { retry_after: None }.to_string(),
            "rate limited"
        );
    }
}
