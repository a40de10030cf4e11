use crate::message::Message;
use crate::runtime::RuntimeError;

use std::fmt::Debug;

use async_trait::async_trait;

/// Sends a request and waits for the reply on a temporary destination.
#[async_trait]
pub trait Requestor
where
    Self: Debug + Send + Sync + 'static,
{
    /// The error type for the requestor.
    type Error: RuntimeError;

    /// Sends `request` and blocks until a reply arrives or the runtime's
    /// response window closes.
    async fn request(&self, request: Message) -> Result<Message, Self::Error>;

    /// Closes the requestor and its temporary reply destination.
    async fn close(&self) -> Result<(), Self::Error>;
}
