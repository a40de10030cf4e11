use crate::consumer::{Consumer, ConsumerKind};
use crate::destination::Destination;
use crate::producer::Producer;
use crate::requestor::Requestor;
use crate::runtime::RuntimeError;

use std::fmt::Debug;

use async_trait::async_trait;

/// How received messages are acknowledged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcknowledgeMode {
    /// The runtime acknowledges each message as it is delivered.
    #[default]
    Auto,

    /// The application acknowledges explicitly.
    Client,

    /// Lazy acknowledgement; duplicates are possible.
    DupsOk,
}

/// A single-threaded context for producing and consuming.
#[async_trait]
pub trait Channel
where
    Self: Debug + Send + Sync + 'static,
{
    /// The error type for the channel.
    type Error: RuntimeError;

    /// The producer type.
    type Producer: Producer<Error = Self::Error>;

    /// The consumer type.
    type Consumer: Consumer<Error = Self::Error>;

    /// The requestor type.
    type Requestor: Requestor<Error = Self::Error>;

    /// Creates a producer bound to `destination`.
    async fn create_producer(
        &self,
        destination: &Destination,
    ) -> Result<Self::Producer, Self::Error>;

    /// Creates a consumer on `destination`.
    ///
    /// Named subscription kinds are only valid on topics; they create the
    /// subscription if it does not exist and resume it otherwise.
    async fn create_consumer(
        &self,
        destination: &Destination,
        kind: ConsumerKind,
    ) -> Result<Self::Consumer, Self::Error>;

    /// Creates a request/reply helper bound to `destination`.
    async fn create_requestor(
        &self,
        destination: &Destination,
    ) -> Result<Self::Requestor, Self::Error>;

    /// Permanently removes a durable subscription.
    async fn unsubscribe(&self, subscription_name: &str) -> Result<(), Self::Error>;

    /// Closes the channel and every handle created from it.
    async fn close(&self) -> Result<(), Self::Error>;
}
