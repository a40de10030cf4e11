use courier_messaging::{RuntimeError, StatusCode};
use thiserror::Error;

/// Errors raised by the in-memory runtime.
#[derive(Clone, Debug, Error)]
#[error("{status}: {message}")]
pub struct Error {
    status: StatusCode,
    message: String,
    context: &'static str,
}

impl Error {
    pub(crate) fn new(
        status: StatusCode,
        context: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            context,
        }
    }

    pub(crate) fn closed(context: &'static str, what: &str) -> Self {
        Self::new(StatusCode::NotConnected, context, format!("{what} is closed"))
    }

    /// The operation that failed.
    #[must_use]
    pub const fn context(&self) -> &'static str {
        self.context
    }
}

impl RuntimeError for Error {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn last_error(&self) -> String {
        self.message.clone()
    }

    fn stack_trace(&self) -> Option<String> {
        Some(format!("at {}", self.context))
    }
}
