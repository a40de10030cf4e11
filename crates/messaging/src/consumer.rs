use crate::listener::MessageListener;
use crate::message::Message;
use crate::runtime::RuntimeError;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

/// What a consumer is attached to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConsumerKind {
    /// An unnamed consumer that only sees messages sent while it is open.
    #[default]
    Plain,

    /// A named subscription that keeps its backlog while no consumer is open.
    /// Only one consumer may be open at a time.
    Durable {
        /// Subscription name.
        name: String,
        /// Selector; empty selects everything.
        selector: String,
    },

    /// A named subscription whose messages are spread across its consumers.
    /// It disappears when its last consumer closes.
    Shared {
        /// Subscription name.
        name: String,
        /// Selector; empty selects everything.
        selector: String,
    },

    /// A named subscription that is both shared and durable.
    SharedDurable {
        /// Subscription name.
        name: String,
        /// Selector; empty selects everything.
        selector: String,
    },
}

impl ConsumerKind {
    /// The subscription name, for named kinds.
    #[must_use]
    pub fn subscription_name(&self) -> Option<&str> {
        match self {
            Self::Plain => None,
            Self::Durable { name, .. }
            | Self::Shared { name, .. }
            | Self::SharedDurable { name, .. } => Some(name),
        }
    }

    /// The selector, for named kinds.
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Plain => None,
            Self::Durable { selector, .. }
            | Self::Shared { selector, .. }
            | Self::SharedDurable { selector, .. } => Some(selector),
        }
    }
}

/// Receives messages from a destination, either by pulling or by push.
#[async_trait]
pub trait Consumer
where
    Self: Debug + Send + Sync + 'static,
{
    /// The error type for the consumer.
    type Error: RuntimeError;

    /// Waits up to `timeout` for one message.
    ///
    /// Returns `Ok(None)` when the deadline passes without a message.
    async fn receive_timeout(&self, timeout: Duration) -> Result<Option<Message>, Self::Error>;

    /// Switches the consumer to push delivery.
    ///
    /// The runtime calls `listener` once per message from a task it owns,
    /// one message at a time, until the consumer is closed.
    async fn set_listener<L>(&self, listener: L) -> Result<(), Self::Error>
    where
        L: MessageListener;

    /// Closes the consumer. Closing twice is harmless.
    async fn close(&self) -> Result<(), Self::Error>;
}
