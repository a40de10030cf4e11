use crate::broker::Attachment;
use crate::channel::{ChannelInner, Shutdown};
use crate::error::Error;
use crate::mailbox::Mailbox;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use courier_messaging::{Consumer, Message, MessageListener, StatusCode};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug)]
struct ConsumerInner {
    channel: Arc<ChannelInner>,
    attachment: Attachment,
    closed: AtomicBool,
    listening: AtomicBool,
    stop: watch::Sender<bool>,
}

impl ConsumerInner {
    fn ensure_open(&self, context: &'static str) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::closed(context, "consumer"));
        }
        self.channel.ensure_open(context)
    }
}

impl Shutdown for ConsumerInner {
    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.stop.send_replace(true);
        self.channel.connection.broker.detach(&self.attachment);
    }
}

impl Drop for ConsumerInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Waits until delivery is started, then takes the next message.
async fn next_delivery(
    started: &mut watch::Receiver<bool>,
    mailbox: &Mailbox,
) -> Option<Message> {
    started.wait_for(|started| *started).await.ok()?;
    Some(mailbox.pop().await)
}

/// Resolves once the consumer is shut down, without holding the watch guard.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// A consumer on a queue, topic or named subscription.
#[derive(Debug)]
pub struct MemoryConsumer {
    inner: Arc<ConsumerInner>,
}

impl MemoryConsumer {
    pub(crate) fn new(channel: Arc<ChannelInner>, attachment: Attachment) -> Self {
        Self {
            inner: Arc::new(ConsumerInner {
                channel,
                attachment,
                closed: AtomicBool::new(false),
                listening: AtomicBool::new(false),
                stop: watch::channel(false).0,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<dyn Shutdown> {
        Arc::<ConsumerInner>::downgrade(&self.inner)
    }
}

#[async_trait]
impl Consumer for MemoryConsumer {
    type Error = Error;

    async fn receive_timeout(&self, wait: Duration) -> Result<Option<Message>, Self::Error> {
        const CONTEXT: &str = "MemoryConsumer::receive";

        self.inner.ensure_open(CONTEXT)?;
        if self.inner.listening.load(Ordering::Acquire) {
            return Err(Error::new(
                StatusCode::IllegalState,
                CONTEXT,
                "consumer has a message listener",
            ));
        }

        let mut started = self.inner.channel.connection.started();
        let mut stop = self.inner.stop.subscribe();
        let mailbox = &self.inner.attachment.mailbox;

        tokio::select! {
            delivered = timeout(wait, next_delivery(&mut started, mailbox)) => match delivered {
                Ok(Some(message)) => Ok(Some(message)),
                Ok(None) => Err(Error::closed(CONTEXT, "connection")),
                Err(_) => Ok(None),
            },
            () = stopped(&mut stop) => Err(Error::closed(CONTEXT, "consumer")),
        }
    }

    async fn set_listener<L>(&self, listener: L) -> Result<(), Self::Error>
    where
        L: MessageListener,
    {
        const CONTEXT: &str = "MemoryConsumer::set_listener";

        self.inner.ensure_open(CONTEXT)?;
        if self.inner.listening.swap(true, Ordering::AcqRel) {
            return Err(Error::new(
                StatusCode::IllegalState,
                CONTEXT,
                "consumer already has a message listener",
            ));
        }

        let mut started = self.inner.channel.connection.started();
        let mut stop = self.inner.stop.subscribe();
        let mailbox = self.inner.attachment.mailbox.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = stopped(&mut stop) => {
                        break;
                    }
                    delivered = next_delivery(&mut started, &mailbox) => {
                        let Some(message) = delivered else {
                            break;
                        };
                        listener.on_message(message).await;
                    }
                }
            }

            debug!("listener task stopped");
        });

        Ok(())
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.inner.shutdown();
        Ok(())
    }
}
