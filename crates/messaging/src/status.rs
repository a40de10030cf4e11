use std::fmt;

/// Machine-readable status of a failed runtime call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The peer rejected the supplied credentials.
    SecurityException,

    /// The server URL could not be parsed or resolved.
    InvalidUrl,

    /// No server is listening at the URL.
    ServerNotConnected,

    /// The handle has already been closed.
    NotConnected,

    /// A destination name was empty or malformed.
    InvalidDestination,

    /// A selector expression failed to parse.
    InvalidSelector,

    /// The requested item does not exist.
    NotFound,

    /// The call is not allowed in the current state.
    IllegalState,

    /// A value could not be converted to the requested type.
    MessageFormat,

    /// No message arrived before the deadline.
    Timeout,

    /// A bounded resource is full.
    LimitExceeded,

    /// Anything the other codes do not cover.
    Unknown,
}

impl StatusCode {
    /// Human readable text for the status.
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::SecurityException => "Security Exception",
            Self::InvalidUrl => "Invalid URL",
            Self::ServerNotConnected => "Server Not Connected",
            Self::NotConnected => "Not Connected",
            Self::InvalidDestination => "Invalid Destination",
            Self::InvalidSelector => "Invalid Selector",
            Self::NotFound => "Not Found",
            Self::IllegalState => "Illegal State",
            Self::MessageFormat => "Message Format Exception",
            Self::Timeout => "Timeout",
            Self::LimitExceeded => "Limit Exceeded",
            Self::Unknown => "Unknown Error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
