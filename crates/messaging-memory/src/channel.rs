use crate::connection::ConnectionInner;
use crate::consumer::MemoryConsumer;
use crate::error::Error;
use crate::producer::MemoryProducer;
use crate::requestor::MemoryRequestor;

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use courier_messaging::{AcknowledgeMode, Channel, ConsumerKind, Destination};
use parking_lot::Mutex;

/// A handle that must be torn down when its channel closes.
pub trait Shutdown: Debug + Send + Sync {
    fn shutdown(&self);
}

#[derive(Debug)]
pub struct ChannelInner {
    pub connection: Arc<ConnectionInner>,
    transacted: bool,
    acknowledge_mode: AcknowledgeMode,
    closed: AtomicBool,
    children: Mutex<Vec<Weak<dyn Shutdown>>>,
}

impl ChannelInner {
    pub fn ensure_open(&self, context: &'static str) -> Result<(), Error> {
        if self.connection.is_closed() {
            return Err(Error::closed(context, "connection"));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::closed(context, "channel"));
        }
        Ok(())
    }

    pub fn adopt(&self, child: Weak<dyn Shutdown>) {
        let mut children = self.children.lock();
        children.retain(|child| child.strong_count() > 0);
        children.push(child);
    }

    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.shutdown();
        }
    }
}

/// A channel on an in-memory connection.
#[derive(Debug)]
pub struct MemoryChannel {
    inner: Arc<ChannelInner>,
}

impl MemoryChannel {
    pub(crate) fn new(
        connection: Arc<ConnectionInner>,
        transacted: bool,
        acknowledge_mode: AcknowledgeMode,
    ) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                connection,
                transacted,
                acknowledge_mode,
                closed: AtomicBool::new(false),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<ChannelInner> {
        Arc::downgrade(&self.inner)
    }

    /// Whether the channel was opened transacted.
    #[must_use]
    pub fn transacted(&self) -> bool {
        self.inner.transacted
    }

    /// The acknowledge mode the channel was opened with.
    #[must_use]
    pub fn acknowledge_mode(&self) -> AcknowledgeMode {
        self.inner.acknowledge_mode
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    type Error = Error;
    type Producer = MemoryProducer;
    type Consumer = MemoryConsumer;
    type Requestor = MemoryRequestor;

    async fn create_producer(
        &self,
        destination: &Destination,
    ) -> Result<Self::Producer, Self::Error> {
        const CONTEXT: &str = "MemoryChannel::create_producer";

        self.inner.ensure_open(CONTEXT)?;
        self.inner
            .connection
            .broker
            .check_send_target(destination, CONTEXT)?;

        Ok(MemoryProducer::new(self.inner.clone(), destination.clone()))
    }

    async fn create_consumer(
        &self,
        destination: &Destination,
        kind: ConsumerKind,
    ) -> Result<Self::Consumer, Self::Error> {
        self.inner.ensure_open("MemoryChannel::create_consumer")?;

        let attachment = self.inner.connection.broker.attach(destination, &kind)?;
        let consumer = MemoryConsumer::new(self.inner.clone(), attachment);
        self.inner.adopt(consumer.downgrade());

        Ok(consumer)
    }

    async fn create_requestor(
        &self,
        destination: &Destination,
    ) -> Result<Self::Requestor, Self::Error> {
        const CONTEXT: &str = "MemoryChannel::create_requestor";

        self.inner.ensure_open(CONTEXT)?;
        self.inner
            .connection
            .broker
            .check_send_target(destination, CONTEXT)?;

        let requestor = MemoryRequestor::new(self.inner.clone(), destination.clone());
        self.inner.adopt(requestor.downgrade());

        Ok(requestor)
    }

    async fn unsubscribe(&self, subscription_name: &str) -> Result<(), Self::Error> {
        self.inner.ensure_open("MemoryChannel::unsubscribe")?;
        self.inner.connection.broker.unsubscribe(subscription_name)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.inner.shutdown();
        Ok(())
    }
}
