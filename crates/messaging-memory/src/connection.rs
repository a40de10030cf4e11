use crate::broker::Broker;
use crate::channel::{ChannelInner, MemoryChannel};
use crate::error::Error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use courier_messaging::{AcknowledgeMode, Connection};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
pub struct ConnectionInner {
    pub broker: Arc<Broker>,
    user_name: String,
    closed: AtomicBool,
    started: watch::Sender<bool>,
    channels: Mutex<Vec<Weak<ChannelInner>>>,
}

impl ConnectionInner {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Receiver that reports whether delivery is currently started.
    pub fn started(&self) -> watch::Receiver<bool> {
        self.started.subscribe()
    }

    fn ensure_open(&self, context: &'static str) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::closed(context, "connection"));
        }
        Ok(())
    }
}

/// A connection to an in-memory broker.
#[derive(Debug)]
pub struct MemoryConnection {
    inner: Arc<ConnectionInner>,
}

impl MemoryConnection {
    pub(crate) fn new(broker: Arc<Broker>, user_name: String) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                broker,
                user_name,
                closed: AtomicBool::new(false),
                started: watch::channel(false).0,
                channels: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether delivery is started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        *self.inner.started.borrow()
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    type Error = Error;
    type Channel = MemoryChannel;

    async fn create_channel(
        &self,
        transacted: bool,
        acknowledge_mode: AcknowledgeMode,
    ) -> Result<Self::Channel, Self::Error> {
        self.inner.ensure_open("MemoryConnection::create_channel")?;

        let channel = MemoryChannel::new(self.inner.clone(), transacted, acknowledge_mode);

        let mut channels = self.inner.channels.lock();
        channels.retain(|channel| channel.strong_count() > 0);
        channels.push(channel.downgrade());

        Ok(channel)
    }

    async fn start(&self) -> Result<(), Self::Error> {
        self.inner.ensure_open("MemoryConnection::start")?;
        self.inner.started.send_replace(true);
        Ok(())
    }

    async fn stop(&self) -> Result<(), Self::Error> {
        self.inner.ensure_open("MemoryConnection::stop")?;
        self.inner.started.send_replace(false);
        Ok(())
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.inner.started.send_replace(false);
        let channels = std::mem::take(&mut *self.inner.channels.lock());
        for channel in channels.iter().filter_map(Weak::upgrade) {
            channel.shutdown();
        }

        debug!(user = %self.inner.user_name, "connection closed");
        Ok(())
    }
}
