//! In-memory implementation of the messaging crate.
//!
//! A [`MemoryRuntime`] owns one broker. Every connection opened through the
//! same runtime (or a clone of it) talks to the same queues, topics and
//! named subscriptions.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod broker;
mod channel;
mod connection;
mod consumer;
mod error;
mod mailbox;
mod producer;
mod requestor;

/// Message selectors for named subscriptions.
pub mod selector;

pub use channel::MemoryChannel;
pub use connection::MemoryConnection;
pub use consumer::MemoryConsumer;
pub use error::Error;
pub use producer::MemoryProducer;
pub use requestor::MemoryRequestor;

use broker::Broker;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_messaging::{Credentials, Runtime};
use tracing::info;

/// Options for an in-memory broker.
#[derive(Clone, Debug)]
pub struct MemoryRuntimeOptions {
    /// The URL the broker pretends to listen on. Connections must name the
    /// same host and port.
    pub server_url: String,

    /// Accepted user names and passwords. When empty, any credentials are
    /// accepted.
    pub users: HashMap<String, String>,

    /// How long a requestor waits for a reply.
    pub request_timeout: Duration,

    /// Maximum backlog of each queue and subscriber.
    pub max_pending: usize,
}

impl Default for MemoryRuntimeOptions {
    fn default() -> Self {
        Self {
            server_url: "tcp://localhost:7222".to_string(),
            users: HashMap::new(),
            request_timeout: Duration::from_secs(30),
            max_pending: 10_000,
        }
    }
}

/// An in-process message-bus runtime.
#[derive(Clone, Debug)]
pub struct MemoryRuntime {
    broker: Arc<Broker>,
}

impl MemoryRuntime {
    /// Creates a runtime with its own empty broker.
    #[must_use]
    pub fn new(options: MemoryRuntimeOptions) -> Self {
        Self {
            broker: Arc::new(Broker::new(options)),
        }
    }

    /// Number of messages waiting in a named subscription, or `None` if no
    /// such subscription exists.
    #[must_use]
    pub fn pending_messages(&self, subscription_name: &str) -> Option<usize> {
        self.broker.pending(subscription_name)
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new(MemoryRuntimeOptions::default())
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    type Error = Error;
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<Self::Connection, Self::Error> {
        self.broker.resolve(url)?;
        self.broker.authenticate(credentials)?;

        info!(url, user = %credentials.user_name, "connected to in-memory broker");

        Ok(MemoryConnection::new(
            self.broker.clone(),
            credentials.user_name.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use courier_messaging::{
        AcknowledgeMode, Channel, Connection, Consumer, ConsumerKind, Destination, Message,
        MessageListener, Producer, Requestor, RuntimeError, StatusCode,
    };
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tracing_test::traced_test;

    const URL: &str = "tcp://localhost:7222";

    #[derive(Clone, Debug)]
    struct ForwardingListener {
        sender: mpsc::UnboundedSender<Message>,
    }

    #[async_trait]
    impl MessageListener for ForwardingListener {
        async fn on_message(&self, message: Message) {
            let _ = self.sender.send(message);
        }
    }

    async fn open(runtime: &MemoryRuntime) -> (MemoryConnection, MemoryChannel) {
        let connection = runtime
            .connect(URL, &Credentials::new("admin", ""))
            .await
            .unwrap();
        let channel = connection
            .create_channel(false, AcknowledgeMode::Auto)
            .await
            .unwrap();
        connection.start().await.unwrap();
        (connection, channel)
    }

    fn text(message: &Message) -> &str {
        match &message.body {
            courier_messaging::Body::Text(text) => text,
            other => panic!("expected text body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authentication() {
        let runtime = MemoryRuntime::new(MemoryRuntimeOptions {
            users: HashMap::from([("admin".to_string(), "secret".to_string())]),
            ..MemoryRuntimeOptions::default()
        });

        let accepted = runtime
            .connect(URL, &Credentials::new("admin", "secret"))
            .await;
        assert!(accepted.is_ok());

        let error = runtime
            .connect(URL, &Credentials::new("admin", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::SecurityException);
        assert_eq!(error.context(), "MemoryRuntime::connect");
        assert_eq!(
            error.stack_trace().as_deref(),
            Some("at MemoryRuntime::connect")
        );
    }

    #[tokio::test]
    async fn test_channel_keeps_its_modes() {
        let runtime = MemoryRuntime::default();
        let connection = runtime
            .connect(URL, &Credentials::default())
            .await
            .unwrap();

        let auto = connection
            .create_channel(false, AcknowledgeMode::Auto)
            .await
            .unwrap();
        assert!(!auto.transacted());
        assert_eq!(auto.acknowledge_mode(), AcknowledgeMode::Auto);

        let client = connection
            .create_channel(true, AcknowledgeMode::Client)
            .await
            .unwrap();
        assert!(client.transacted());
        assert_eq!(client.acknowledge_mode(), AcknowledgeMode::Client);
    }

    #[tokio::test]
    async fn test_queue_send_and_receive() {
        let runtime = MemoryRuntime::default();
        let (_connection, channel) = open(&runtime).await;
        let queue = Destination::queue("test.queue");

        let producer = channel.create_producer(&queue).await.unwrap();
        let consumer = channel
            .create_consumer(&queue, ConsumerKind::Plain)
            .await
            .unwrap();

        producer
            .send(Message::text("hello").with_property("count", 1_i64))
            .await
            .unwrap();

        let received = consumer
            .receive_timeout(Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text(&received), "hello");
        assert_eq!(received.destination, Some(queue));
        assert!(received.message_id.as_deref().is_some_and(|id| id.starts_with("ID:")));
        assert!(received.timestamp.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_times_out() {
        let runtime = MemoryRuntime::default();
        let (_connection, channel) = open(&runtime).await;
        let consumer = channel
            .create_consumer(&Destination::queue("empty"), ConsumerKind::Plain)
            .await
            .unwrap();

        let received = consumer
            .receive_timeout(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(received, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_waits_for_start() {
        let runtime = MemoryRuntime::default();
        let connection = runtime
            .connect(URL, &Credentials::default())
            .await
            .unwrap();
        let channel = connection
            .create_channel(false, AcknowledgeMode::Auto)
            .await
            .unwrap();
        let queue = Destination::queue("gated");
        let consumer = channel
            .create_consumer(&queue, ConsumerKind::Plain)
            .await
            .unwrap();
        let producer = channel.create_producer(&queue).await.unwrap();
        producer.send(Message::text("waiting")).await.unwrap();

        let received = consumer
            .receive_timeout(Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(received, None);
        assert!(!connection.is_started());

        connection.start().await.unwrap();
        assert!(connection.is_started());
        let received = consumer
            .receive_timeout(Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(received.as_ref().map(text), Some("waiting"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_pauses_delivery() {
        let runtime = MemoryRuntime::default();
        let (connection, channel) = open(&runtime).await;
        let queue = Destination::queue("paused");
        let consumer = channel
            .create_consumer(&queue, ConsumerKind::Plain)
            .await
            .unwrap();
        let producer = channel.create_producer(&queue).await.unwrap();

        connection.stop().await.unwrap();
        assert!(!connection.is_started());
        producer.send(Message::text("held")).await.unwrap();

        let received = consumer
            .receive_timeout(Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(received, None);

        connection.start().await.unwrap();
        let received = consumer
            .receive_timeout(Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(received.as_ref().map(text), Some("held"));

        connection.close().await.unwrap();
        let result = connection.stop().await;
        assert_matches!(result.map_err(|e| e.status()), Err(StatusCode::NotConnected));
    }

    #[tokio::test]
    async fn test_topic_only_reaches_open_consumers() {
        let runtime = MemoryRuntime::default();
        let (_connection, channel) = open(&runtime).await;
        let topic = Destination::topic("news");
        let producer = channel.create_producer(&topic).await.unwrap();

        producer.send(Message::text("early")).await.unwrap();

        let consumer = channel
            .create_consumer(&topic, ConsumerKind::Plain)
            .await
            .unwrap();
        producer.send(Message::text("late")).await.unwrap();

        let received = consumer
            .receive_timeout(Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text(&received), "late");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_listener_receives_messages() {
        let runtime = MemoryRuntime::default();
        let (_connection, channel) = open(&runtime).await;
        let queue = Destination::queue("pushed");
        let consumer = channel
            .create_consumer(&queue, ConsumerKind::Plain)
            .await
            .unwrap();

        let (sender, mut receiver) = mpsc::unbounded_channel();
        consumer
            .set_listener(ForwardingListener { sender })
            .await
            .unwrap();

        let producer = channel.create_producer(&queue).await.unwrap();
        producer.send(Message::text("one")).await.unwrap();
        producer.send(Message::text("two")).await.unwrap();

        let first = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        let second = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text(&first), "one");
        assert_eq!(text(&second), "two");

        let result = consumer.receive_timeout(Duration::from_millis(10)).await;
        assert_matches!(result.map_err(|e| e.status()), Err(StatusCode::IllegalState));

        let result = consumer
            .set_listener(ForwardingListener {
                sender: mpsc::unbounded_channel().0,
            })
            .await;
        assert_matches!(result.map_err(|e| e.status()), Err(StatusCode::IllegalState));

        consumer.close().await.unwrap();
        assert!(logs_contain("connected to in-memory broker"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_listener_on_worker_threads_stops_with_consumer() {
        let runtime = MemoryRuntime::default();
        let (_connection, channel) = open(&runtime).await;
        let topic = Destination::topic("threaded");
        let consumer = channel
            .create_consumer(&topic, ConsumerKind::Plain)
            .await
            .unwrap();

        let (sender, mut receiver) = mpsc::unbounded_channel();
        consumer
            .set_listener(ForwardingListener { sender })
            .await
            .unwrap();

        let producer = channel.create_producer(&topic).await.unwrap();
        for index in 0..10 {
            producer
                .send(Message::text(format!("message {index}")))
                .await
                .unwrap();
        }
        for index in 0..10 {
            let message = timeout(Duration::from_secs(5), receiver.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(text(&message), format!("message {index}"));
        }

        // The listener task drops its sender when it exits.
        consumer.close().await.unwrap();
        let closed = timeout(Duration::from_secs(5), receiver.recv()).await.unwrap();
        assert_eq!(closed, None);
    }

    #[tokio::test]
    async fn test_closed_handles_refuse_work() {
        let runtime = MemoryRuntime::default();
        let (connection, channel) = open(&runtime).await;
        let queue = Destination::queue("closing");
        let producer = channel.create_producer(&queue).await.unwrap();
        let consumer = channel
            .create_consumer(&queue, ConsumerKind::Plain)
            .await
            .unwrap();

        connection.close().await.unwrap();
        connection.close().await.unwrap();

        let result = producer.send(Message::text("late")).await;
        assert_matches!(result.map_err(|e| e.status()), Err(StatusCode::NotConnected));

        let result = consumer.receive_timeout(Duration::from_millis(10)).await;
        assert_matches!(result.map_err(|e| e.status()), Err(StatusCode::NotConnected));

        let result = connection.create_channel(false, AcknowledgeMode::Auto).await;
        assert_matches!(result.map_err(|e| e.status()), Err(StatusCode::NotConnected));
    }

    #[tokio::test]
    async fn test_closing_channel_releases_durable_subscription() {
        let runtime = MemoryRuntime::default();
        let (connection, channel) = open(&runtime).await;
        let topic = Destination::topic("audit");
        let kind = ConsumerKind::Durable {
            name: "auditor".to_string(),
            selector: String::new(),
        };

        let _consumer = channel.create_consumer(&topic, kind.clone()).await.unwrap();
        channel.close().await.unwrap();

        let second = connection
            .create_channel(false, AcknowledgeMode::Auto)
            .await
            .unwrap();
        assert!(second.create_consumer(&topic, kind).await.is_ok());
    }

    #[tokio::test]
    async fn test_request_reply() {
        let runtime = MemoryRuntime::default();
        let (_connection, channel) = open(&runtime).await;
        let service = Destination::queue("test.request");

        let server = channel
            .create_consumer(&service, ConsumerKind::Plain)
            .await
            .unwrap();
        let (_responder_connection, responder_channel) = open(&runtime).await;
        let responder = tokio::spawn(async move {
            let request = server
                .receive_timeout(Duration::from_secs(1))
                .await
                .unwrap()
                .unwrap();
            let reply_to = request.reply_to.clone().unwrap();
            let producer = responder_channel.create_producer(&reply_to).await.unwrap();
            producer
                .send(Message::text(format!("re: {}", text(&request))))
                .await
                .unwrap();
        });

        let requestor = channel.create_requestor(&service).await.unwrap();
        let reply = requestor.request(Message::text("ping")).await.unwrap();
        assert_eq!(text(&reply), "re: ping");
        responder.await.unwrap();

        let reply_to = requestor.reply_to().clone();
        requestor.close().await.unwrap();
        let producer = channel.create_producer(&reply_to).await;
        assert_matches!(producer.map_err(|e| e.status()), Err(StatusCode::InvalidDestination));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_times_out() {
        let runtime = MemoryRuntime::new(MemoryRuntimeOptions {
            request_timeout: Duration::from_secs(2),
            ..MemoryRuntimeOptions::default()
        });
        let (_connection, channel) = open(&runtime).await;
        let requestor = channel
            .create_requestor(&Destination::queue("nobody.home"))
            .await
            .unwrap();

        let result = requestor.request(Message::text("hello?")).await;
        assert_matches!(result.map_err(|e| e.status()), Err(StatusCode::Timeout));
    }

    #[tokio::test]
    async fn test_shared_subscription_spreads_messages() {
        let runtime = MemoryRuntime::default();
        let (_connection, channel) = open(&runtime).await;
        let topic = Destination::topic("work");
        let kind = ConsumerKind::Shared {
            name: "workers".to_string(),
            selector: String::new(),
        };

        let first = channel.create_consumer(&topic, kind.clone()).await.unwrap();
        let second = channel.create_consumer(&topic, kind).await.unwrap();

        let producer = channel.create_producer(&topic).await.unwrap();
        producer.send(Message::text("a")).await.unwrap();
        producer.send(Message::text("b")).await.unwrap();

        let from_first = first
            .receive_timeout(Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        let from_second = second
            .receive_timeout(Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text(&from_first), "a");
        assert_eq!(text(&from_second), "b");
    }
}
