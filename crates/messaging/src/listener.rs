use crate::message::Message;

use std::fmt::Debug;

use async_trait::async_trait;

/// Receives messages pushed by a consumer.
#[async_trait]
pub trait MessageListener
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// Handles one delivered message.
    async fn on_message(&self, message: Message);
}
