use crate::message::Message;
use crate::runtime::RuntimeError;

use std::fmt::Debug;

use async_trait::async_trait;

/// Sends messages to the destination it was created for.
#[async_trait]
pub trait Producer
where
    Self: Debug + Send + Sync + 'static,
{
    /// The error type for the producer.
    type Error: RuntimeError;

    /// Sends a message once. The runtime fills in id, timestamp and
    /// destination.
    async fn send(&self, message: Message) -> Result<(), Self::Error>;

    /// Closes the producer.
    async fn close(&self) -> Result<(), Self::Error>;
}
