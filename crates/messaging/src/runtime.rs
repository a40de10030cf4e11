use crate::connection::Connection;
use crate::status::StatusCode;

use std::error::Error;
use std::fmt::{self, Debug};

use async_trait::async_trait;

/// Errors reported by a runtime.
///
/// Every failed runtime call carries a status code, the runtime's last error
/// text and whatever stack context it recorded.
pub trait RuntimeError: Debug + Error + Send + Sync + 'static {
    /// The status code of the failure.
    fn status(&self) -> StatusCode;

    /// The runtime's last error message.
    fn last_error(&self) -> String {
        self.to_string()
    }

    /// Stack context recorded by the runtime, if any.
    fn stack_trace(&self) -> Option<String> {
        None
    }
}

/// User name and password presented when connecting.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// The user name.
    pub user_name: String,

    /// The password.
    pub password: String,
}

impl Credentials {
    /// Creates a set of credentials.
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A message-bus runtime: the entry point that opens connections.
#[async_trait]
pub trait Runtime
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// The error type for the runtime and every handle it creates.
    type Error: RuntimeError;

    /// The connection type.
    type Connection: Connection<Error = Self::Error>;

    /// Opens an authenticated connection to the server at `url`.
    async fn connect(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<Self::Connection, Self::Error>;
}
