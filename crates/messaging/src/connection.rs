use crate::channel::{AcknowledgeMode, Channel};
use crate::runtime::RuntimeError;

use std::fmt::Debug;

use async_trait::async_trait;

/// An authenticated link to a bus.
///
/// Consumers created under a connection only receive messages while the
/// connection is started.
#[async_trait]
pub trait Connection
where
    Self: Debug + Send + Sync + 'static,
{
    /// The error type for the connection.
    type Error: RuntimeError;

    /// The channel type.
    type Channel: Channel<Error = Self::Error>;

    /// Opens a channel on this connection.
    async fn create_channel(
        &self,
        transacted: bool,
        acknowledge_mode: AcknowledgeMode,
    ) -> Result<Self::Channel, Self::Error>;

    /// Starts (or resumes) message delivery. Starting twice is harmless.
    async fn start(&self) -> Result<(), Self::Error>;

    /// Pauses message delivery.
    async fn stop(&self) -> Result<(), Self::Error>;

    /// Closes the connection and every channel under it.
    async fn close(&self) -> Result<(), Self::Error>;
}
