use std::fmt;

/// Whether a destination fans out or load-balances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    /// Publish/subscribe: every subscriber gets a copy.
    Topic,

    /// Point-to-point: exactly one consumer gets each message.
    Queue,
}

/// A named addressing target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Destination {
    name: String,
    kind: DestinationKind,
}

impl Destination {
    /// Creates a destination of the given kind.
    pub fn new(name: impl Into<String>, kind: DestinationKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates a topic destination.
    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(name, DestinationKind::Topic)
    }

    /// Creates a queue destination.
    pub fn queue(name: impl Into<String>) -> Self {
        Self::new(name, DestinationKind::Queue)
    }

    /// Creates a topic when `is_topic` is set, a queue otherwise.
    pub fn from_flag(name: impl Into<String>, is_topic: bool) -> Self {
        if is_topic {
            Self::topic(name)
        } else {
            Self::queue(name)
        }
    }

    /// The destination name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The destination kind.
    #[must_use]
    pub const fn kind(&self) -> DestinationKind {
        self.kind
    }

    /// Whether this is a topic.
    #[must_use]
    pub const fn is_topic(&self) -> bool {
        matches!(self.kind, DestinationKind::Topic)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DestinationKind::Topic => write!(f, "topic:{}", self.name),
            DestinationKind::Queue => write!(f, "queue:{}", self.name),
        }
    }
}
