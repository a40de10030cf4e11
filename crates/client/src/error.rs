use std::time::Duration;

use courier_messaging::{BodyKind, RuntimeError, StatusCode};
use thiserror::Error;

/// A failed runtime call, as reported by the runtime.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct StatusError {
    /// The runtime's status code.
    pub status: StatusCode,

    /// The runtime's last error message.
    pub message: String,

    /// Stack context recorded by the runtime, if any.
    pub stack_trace: Option<String>,
}

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The session has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The runtime reported a failure.
    #[error(transparent)]
    Runtime(#[from] StatusError),

    /// A message body of a kind the session cannot produce or decode.
    #[error("unsupported body kind: {0}")]
    UnsupportedBodyKind(BodyKind),
}

impl Error {
    /// Captures a runtime error's status, message and stack context.
    pub fn runtime<E>(error: E) -> Self
    where
        E: RuntimeError,
    {
        Self::Runtime(StatusError {
            status: error.status(),
            message: error.last_error(),
            stack_trace: error.stack_trace(),
        })
    }

    pub(crate) fn timeout(waited: Duration) -> Self {
        Self::Runtime(StatusError {
            status: StatusCode::Timeout,
            message: format!("no message received within {waited:?}"),
            stack_trace: None,
        })
    }

    /// The runtime status code, for runtime failures.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Runtime(error) => Some(error.status),
            _ => None,
        }
    }

    /// Whether the operation failed because nothing arrived in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.status() == Some(StatusCode::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use courier_messaging::FieldError;

    #[test]
    fn test_runtime_error_is_captured() {
        let error = Error::runtime(FieldError::NotFound("name".to_string()));

        assert_eq!(error.status(), Some(StatusCode::NotFound));
        assert!(!error.is_timeout());
        assert!(error.to_string().contains("name"));
    }

    #[test]
    fn test_timeout() {
        let error = Error::timeout(Duration::from_secs(1));

        assert!(error.is_timeout());
        assert!(error.to_string().starts_with(StatusCode::Timeout.text()));
    }
}
