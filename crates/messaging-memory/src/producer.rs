use crate::channel::ChannelInner;
use crate::error::Error;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use courier_messaging::{Destination, Message, Producer};
use tracing::trace;
use uuid::Uuid;

/// Stamps the header fields the broker owns.
pub fn stamp(message: &mut Message, destination: &Destination) {
    message.message_id = Some(format!("ID:{}", Uuid::new_v4()));
    message.timestamp = Some(Utc::now().timestamp_millis());
    message.destination = Some(destination.clone());
}

/// A producer bound to one destination.
#[derive(Debug)]
pub struct MemoryProducer {
    channel: Arc<ChannelInner>,
    destination: Destination,
    closed: AtomicBool,
}

impl MemoryProducer {
    pub(crate) const fn new(channel: Arc<ChannelInner>, destination: Destination) -> Self {
        Self {
            channel,
            destination,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Producer for MemoryProducer {
    type Error = Error;

    async fn send(&self, mut message: Message) -> Result<(), Self::Error> {
        const CONTEXT: &str = "MemoryProducer::send";

        if self.closed.load(Ordering::Acquire) {
            return Err(Error::closed(CONTEXT, "producer"));
        }
        self.channel.ensure_open(CONTEXT)?;

        stamp(&mut message, &self.destination);
        trace!(destination = %self.destination, id = ?message.message_id, "sending");

        self.channel
            .connection
            .broker
            .publish(&self.destination, &message)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
