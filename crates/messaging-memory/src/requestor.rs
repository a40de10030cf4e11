use crate::channel::{ChannelInner, Shutdown};
use crate::error::Error;
use crate::mailbox::Mailbox;
use crate::producer::stamp;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use courier_messaging::{Destination, Message, Requestor, StatusCode};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug)]
struct RequestorInner {
    channel: Arc<ChannelInner>,
    destination: Destination,
    reply_to: Destination,
    replies: Arc<Mailbox>,
    closed: AtomicBool,
    in_flight: Mutex<()>,
}

impl Shutdown for RequestorInner {
    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.channel
            .connection
            .broker
            .delete_temporary_queue(&self.reply_to);
    }
}

impl Drop for RequestorInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sends requests to one destination and collects replies on a temporary
/// queue.
#[derive(Debug)]
pub struct MemoryRequestor {
    inner: Arc<RequestorInner>,
}

impl MemoryRequestor {
    pub(crate) fn new(channel: Arc<ChannelInner>, destination: Destination) -> Self {
        let (reply_to, replies) = channel.connection.broker.create_temporary_queue();

        Self {
            inner: Arc::new(RequestorInner {
                channel,
                destination,
                reply_to,
                replies,
                closed: AtomicBool::new(false),
                in_flight: Mutex::new(()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<dyn Shutdown> {
        Arc::<RequestorInner>::downgrade(&self.inner)
    }

    /// The temporary queue replies are read from.
    #[must_use]
    pub fn reply_to(&self) -> &Destination {
        &self.inner.reply_to
    }
}

#[async_trait]
impl Requestor for MemoryRequestor {
    type Error = Error;

    async fn request(&self, mut request: Message) -> Result<Message, Self::Error> {
        const CONTEXT: &str = "MemoryRequestor::request";

        let inner = &self.inner;
        let _guard = inner.in_flight.lock().await;

        if inner.closed.load(Ordering::Acquire) {
            return Err(Error::closed(CONTEXT, "requestor"));
        }
        inner.channel.ensure_open(CONTEXT)?;

        // Stale replies from an earlier timed-out request.
        inner.replies.clear();

        stamp(&mut request, &inner.destination);
        request.reply_to = Some(inner.reply_to.clone());
        debug!(destination = %inner.destination, reply_to = %inner.reply_to, "sending request");

        let broker = &inner.channel.connection.broker;
        broker.publish(&inner.destination, &request)?;

        let window = broker.options().request_timeout;
        timeout(window, inner.replies.pop()).await.map_err(|_| {
            Error::new(
                StatusCode::Timeout,
                CONTEXT,
                format!("no reply from {} within {window:?}", inner.destination),
            )
        })
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.inner.shutdown();
        Ok(())
    }
}
