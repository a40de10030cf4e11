use crate::config::SessionConfig;
use crate::error::{Error, StatusError};
use crate::listener::{Dispatcher, ListenerId, ListenerTable};
use crate::payload::{Payload, decode};

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use courier_messaging::{
    AcknowledgeMode, Channel, Connection, Consumer, ConsumerKind, Credentials, Destination,
    Message, Producer, Requestor, Runtime, RuntimeError, StatusCode,
};
use parking_lot::Mutex;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

type ChannelOf<R> = <<R as Runtime>::Connection as Connection>::Channel;
type ConsumerOf<R> = <ChannelOf<R> as Channel>::Consumer;

/// Logs a failed close of a short-lived handle.
fn release<E: Display>(result: Result<(), E>, what: &str) {
    if let Err(e) = result {
        warn!("failed to close {what}: {e}");
    }
}

/// Logs a failed close during teardown and keeps the first failure.
fn record<E: RuntimeError>(first_error: &mut Option<Error>, result: Result<(), E>, what: &str) {
    if let Err(e) = result {
        warn!("failed to close {what}: {e}");
        if first_error.is_none() {
            *first_error = Some(Error::runtime(e));
        }
    }
}

#[derive(Debug)]
struct Open<R: Runtime> {
    connection: R::Connection,
    channel: ChannelOf<R>,
    debug: bool,
    listeners: Mutex<HashMap<ListenerId, ConsumerOf<R>>>,
}

impl<R: Runtime> Open<R> {
    fn dump(&self, direction: &str, message: &Message) {
        if self.debug {
            info!("{direction} {message}");
        }
    }

    /// Opens a consumer, waits for one message and closes the consumer.
    async fn consume(
        &self,
        destination: &Destination,
        kind: ConsumerKind,
        timeout: Duration,
    ) -> Result<String, Error> {
        let consumer = self
            .channel
            .create_consumer(destination, kind)
            .await
            .map_err(Error::runtime)?;

        let received = self.receive_one(&consumer, timeout).await;
        release(consumer.close().await, "consumer");

        received
    }

    async fn receive_one(
        &self,
        consumer: &ConsumerOf<R>,
        timeout: Duration,
    ) -> Result<String, Error> {
        self.connection.start().await.map_err(Error::runtime)?;

        let message = consumer
            .receive_timeout(timeout)
            .await
            .map_err(Error::runtime)?
            .ok_or_else(|| Error::timeout(timeout))?;
        self.dump("received", &message);

        decode(&message)
    }
}

/// A connection and channel to a message bus, with the operations a client
/// needs on top of them.
///
/// Every operation fails with [`Error::ConnectionClosed`] once the session is
/// closed. Dropping a session without closing it drops the runtime handles
/// without an orderly close.
#[derive(Debug)]
pub struct Session<R: Runtime> {
    state: RwLock<Option<Open<R>>>,
    listeners: Arc<ListenerTable>,
}

impl<R: Runtime> Session<R> {
    /// Connects, authenticates and opens a non-transacted, auto-acknowledge
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns the runtime's error if the URL is invalid, the server cannot be
    /// reached, authentication fails or the channel cannot be opened.
    pub async fn create(runtime: &R, config: &SessionConfig) -> Result<Self, Error> {
        let credentials = Credentials::new(&config.user_name, &config.password);
        let connection = runtime
            .connect(&config.server_url, &credentials)
            .await
            .map_err(Error::runtime)?;

        let channel = match connection.create_channel(false, AcknowledgeMode::Auto).await {
            Ok(channel) => channel,
            Err(e) => {
                release(connection.close().await, "connection");
                return Err(Error::runtime(e));
            }
        };

        debug!(url = %config.server_url, user = %config.user_name, "session created");

        Ok(Self {
            state: RwLock::new(Some(Open {
                connection,
                channel,
                debug: config.debug,
                listeners: Mutex::new(HashMap::new()),
            })),
            listeners: Arc::new(ListenerTable::default()),
        })
    }

    async fn open(&self) -> Result<RwLockReadGuard<'_, Open<R>>, Error> {
        RwLockReadGuard::try_map(self.state.read().await, |state| state.as_ref())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Whether the session is still open.
    pub async fn is_connected(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Whether messages are dumped to the log.
    pub async fn is_debug(&self) -> bool {
        self.state.read().await.as_ref().is_some_and(|open| open.debug)
    }

    /// Closes every listener, then the channel, then the connection.
    ///
    /// Waits for operations already in progress. Closing an already closed
    /// session does nothing. Teardown carries on past failures and the first
    /// one is returned once everything has been released.
    ///
    /// # Errors
    ///
    /// Returns the first error the runtime reported while closing.
    pub async fn close(&self) -> Result<(), Error> {
        let Some(open) = self.state.write().await.take() else {
            return Ok(());
        };

        // No callback starts after this point.
        self.listeners.clear();

        let mut first_error = None;
        for (id, consumer) in open.listeners.into_inner() {
            debug!(listener = %id, "closing listener");
            record(&mut first_error, consumer.close().await, "listener consumer");
        }
        record(&mut first_error, open.channel.close().await, "channel");
        record(&mut first_error, open.connection.close().await, "connection");

        debug!("session closed");
        first_error.map_or(Ok(()), Err)
    }

    /// Sends one message to a topic or queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBodyKind`] for payloads that are neither
    /// text nor map, and the runtime's error if the send fails.
    pub async fn send(
        &self,
        destination: &str,
        is_topic: bool,
        payload: &Payload,
    ) -> Result<(), Error> {
        let open = self.open().await?;
        let destination = Destination::from_flag(destination, is_topic);
        let message = payload.to_message()?;

        let producer = open
            .channel
            .create_producer(&destination)
            .await
            .map_err(Error::runtime)?;

        open.dump("sending", &message);
        let sent = producer.send(message).await.map_err(Error::runtime);
        release(producer.close().await, "producer");

        sent
    }

    /// Waits up to `timeout` for one message from a topic or queue and
    /// returns its text.
    ///
    /// # Errors
    ///
    /// Fails with status [`StatusCode::Timeout`] if nothing arrives in time,
    /// [`Error::UnsupportedBodyKind`] if the message is neither text nor map,
    /// and the runtime's error for anything else.
    pub async fn receive(
        &self,
        destination: &str,
        is_topic: bool,
        timeout: Duration,
    ) -> Result<String, Error> {
        let open = self.open().await?;
        let destination = Destination::from_flag(destination, is_topic);

        open.consume(&destination, ConsumerKind::Plain, timeout).await
    }

    /// Sends a request and returns the text of its reply.
    ///
    /// Waits as long as the runtime's response window allows.
    ///
    /// # Errors
    ///
    /// Fails with status [`StatusCode::Timeout`] if no reply arrives, and as
    /// [`Session::send`] and [`Session::receive`] otherwise.
    pub async fn request(
        &self,
        destination: &str,
        is_topic: bool,
        payload: &Payload,
    ) -> Result<String, Error> {
        let open = self.open().await?;
        let destination = Destination::from_flag(destination, is_topic);
        let message = payload.to_message()?;

        let requestor = open
            .channel
            .create_requestor(&destination)
            .await
            .map_err(Error::runtime)?;

        let replied = async {
            open.connection.start().await.map_err(Error::runtime)?;

            open.dump("requesting", &message);
            let reply = requestor.request(message).await.map_err(Error::runtime)?;
            open.dump("reply", &reply);

            decode(&reply)
        }
        .await;
        release(requestor.close().await, "requestor");

        replied
    }

    /// Calls `on_message` with the text of every message arriving at a topic
    /// or queue until the listener is unregistered or the session closes.
    ///
    /// Calls for one listener never overlap. Messages that cannot be decoded
    /// are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the runtime's error if the consumer cannot be created or
    /// delivery cannot be started.
    pub async fn register_listener<F>(
        &self,
        destination: &str,
        is_topic: bool,
        on_message: F,
    ) -> Result<ListenerId, Error>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let open = self.open().await?;
        let destination = Destination::from_flag(destination, is_topic);

        let consumer = open
            .channel
            .create_consumer(&destination, ConsumerKind::Plain)
            .await
            .map_err(Error::runtime)?;

        let id = ListenerId::new();
        self.listeners.insert(id, Arc::new(on_message));

        let dispatcher = Dispatcher::new(id, self.listeners.clone(), open.debug);
        let registered = match consumer.set_listener(dispatcher).await {
            Ok(()) => open.connection.start().await.map_err(Error::runtime),
            Err(e) => Err(Error::runtime(e)),
        };

        if let Err(e) = registered {
            self.listeners.remove(id);
            release(consumer.close().await, "consumer");
            return Err(e);
        }

        open.listeners.lock().insert(id, consumer);
        debug!(listener = %id, %destination, "listener registered");

        Ok(id)
    }

    /// Stops a listener and closes its consumer.
    ///
    /// # Errors
    ///
    /// Fails with status [`StatusCode::NotFound`] if no such listener is
    /// registered, or the runtime's error if the consumer fails to close.
    pub async fn unregister_listener(&self, id: ListenerId) -> Result<(), Error> {
        let open = self.open().await?;

        self.listeners.remove(id);
        let consumer = open.listeners.lock().remove(&id);
        let Some(consumer) = consumer else {
            return Err(Error::Runtime(StatusError {
                status: StatusCode::NotFound,
                message: format!("listener {id} is not registered"),
                stack_trace: None,
            }));
        };

        debug!(listener = %id, "listener unregistered");
        consumer.close().await.map_err(Error::runtime)
    }

    /// Receives one message through a durable subscription, creating it if
    /// needed. Messages published while no consumer is open are kept until
    /// received or until [`Session::unsubscribe`].
    ///
    /// # Errors
    ///
    /// As [`Session::receive`]; also fails if the subscription is in use or
    /// the selector is invalid.
    pub async fn subscribe_durable(
        &self,
        topic: &str,
        subscription_name: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, Error> {
        let kind = ConsumerKind::Durable {
            name: subscription_name.to_string(),
            selector: selector.to_string(),
        };
        self.subscribe(topic, kind, timeout).await
    }

    /// Receives one message through a shared subscription. The subscription
    /// only exists while it has open consumers.
    ///
    /// # Errors
    ///
    /// As [`Session::subscribe_durable`].
    pub async fn subscribe_shared(
        &self,
        topic: &str,
        subscription_name: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, Error> {
        let kind = ConsumerKind::Shared {
            name: subscription_name.to_string(),
            selector: selector.to_string(),
        };
        self.subscribe(topic, kind, timeout).await
    }

    /// Receives one message through a shared durable subscription.
    ///
    /// # Errors
    ///
    /// As [`Session::subscribe_durable`].
    pub async fn subscribe_shared_durable(
        &self,
        topic: &str,
        subscription_name: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, Error> {
        let kind = ConsumerKind::SharedDurable {
            name: subscription_name.to_string(),
            selector: selector.to_string(),
        };
        self.subscribe(topic, kind, timeout).await
    }

    async fn subscribe(
        &self,
        topic: &str,
        kind: ConsumerKind,
        timeout: Duration,
    ) -> Result<String, Error> {
        let open = self.open().await?;
        open.consume(&Destination::topic(topic), kind, timeout).await
    }

    /// Removes a durable subscription and its backlog.
    ///
    /// # Errors
    ///
    /// Returns the runtime's error if the subscription does not exist or
    /// still has an open consumer.
    pub async fn unsubscribe(&self, subscription_name: &str) -> Result<(), Error> {
        let open = self.open().await?;
        open.channel
            .unsubscribe(subscription_name)
            .await
            .map_err(Error::runtime)
    }
}
