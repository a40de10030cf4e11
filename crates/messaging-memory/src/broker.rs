use crate::error::Error;
use crate::mailbox::{Mailbox, Push};
use crate::selector::Selector;
use crate::MemoryRuntimeOptions;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use courier_messaging::{
    ConsumerKind, Credentials, Destination, DestinationKind, Message, StatusCode,
};
use parking_lot::Mutex;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const TEMPORARY_PREFIX: &str = "$TMP$.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SubscriptionKind {
    Durable,
    Shared,
    SharedDurable,
}

impl SubscriptionKind {
    const fn describe(self) -> &'static str {
        match self {
            Self::Durable => "durable",
            Self::Shared => "shared",
            Self::SharedDurable => "shared durable",
        }
    }
}

#[derive(Debug)]
struct TopicSubscriber {
    id: Uuid,
    pattern: String,
    selector: Selector,
    mailbox: Arc<Mailbox>,
}

#[derive(Debug)]
struct NamedSubscription {
    kind: SubscriptionKind,
    topic: String,
    selector: String,
    subscriber_id: Uuid,
    mailbox: Arc<Mailbox>,
    active: usize,
}

#[derive(Debug)]
struct Queue {
    mailbox: Arc<Mailbox>,
    consumers: usize,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, Queue>,
    temporary: HashSet<String>,
    topic_subscribers: Vec<TopicSubscriber>,
    subscriptions: HashMap<String, NamedSubscription>,
}

impl State {
    fn remove_subscriber(&mut self, id: Uuid) {
        self.topic_subscribers.retain(|subscriber| subscriber.id != id);
    }

    fn check_temporary(
        &self,
        destination: &Destination,
        context: &'static str,
    ) -> Result<(), Error> {
        if destination.name().starts_with(TEMPORARY_PREFIX)
            && !self.temporary.contains(destination.name())
        {
            return Err(Error::new(
                StatusCode::InvalidDestination,
                context,
                format!("temporary destination '{}' does not exist", destination.name()),
            ));
        }
        Ok(())
    }

    fn queue(&mut self, name: &str, capacity: usize) -> &mut Queue {
        self.queues.entry(name.to_string()).or_insert_with(|| Queue {
            mailbox: Arc::new(Mailbox::new(capacity)),
            consumers: 0,
        })
    }

    /// Drops a plain queue nobody reads and nothing waits in.
    fn prune_queue(&mut self, name: &str) {
        if self.temporary.contains(name) {
            return;
        }
        let idle = self
            .queues
            .get(name)
            .is_some_and(|queue| queue.consumers == 0 && queue.mailbox.is_empty());
        if idle {
            self.queues.remove(name);
        }
    }
}

/// What a consumer is reading from.
#[derive(Clone, Debug)]
pub enum Target {
    Queue(String),
    Topic(Uuid),
    Subscription(String),
}

/// A consumer's link into the broker.
#[derive(Clone, Debug)]
pub struct Attachment {
    pub target: Target,
    pub mailbox: Arc<Mailbox>,
}

/// Returns whether a topic `name` is matched by a subscriber `pattern`.
///
/// `*` matches exactly one token, `>` matches one or more trailing tokens.
pub fn topic_matches(pattern: &str, name: &str) -> bool {
    let mut pattern = pattern.split('.');
    let mut name = name.split('.');
    loop {
        match (pattern.next(), name.next()) {
            (Some(">"), Some(_)) | (None, None) => return true,
            (Some(p), Some(n)) if p == "*" || p == n => {}
            _ => return false,
        }
    }
}

fn validate_name(name: &str, allow_wildcards: bool, context: &'static str) -> Result<(), Error> {
    let invalid = |reason: &str| {
        Err(Error::new(
            StatusCode::InvalidDestination,
            context,
            format!("invalid destination name '{name}': {reason}"),
        ))
    };

    if name.is_empty() {
        return invalid("name is empty");
    }

    let tokens: Vec<&str> = name.split('.').collect();
    for (index, token) in tokens.iter().enumerate() {
        if token.is_empty() {
            return invalid("empty token");
        }
        if token.contains('*') || token.contains('>') {
            if !allow_wildcards {
                return invalid("wildcards are not allowed here");
            }
            if *token != "*" && *token != ">" {
                return invalid("wildcards must be whole tokens");
            }
            if *token == ">" && index != tokens.len() - 1 {
                return invalid("'>' must be the last token");
            }
        }
    }

    Ok(())
}

/// Shared state of one in-memory server.
#[derive(Debug)]
pub struct Broker {
    options: MemoryRuntimeOptions,
    state: Mutex<State>,
}

impl Broker {
    pub fn new(options: MemoryRuntimeOptions) -> Self {
        Self {
            options,
            state: Mutex::new(State::default()),
        }
    }

    pub const fn options(&self) -> &MemoryRuntimeOptions {
        &self.options
    }

    /// Checks that one of the comma-separated URLs points at this server.
    pub fn resolve(&self, urls: &str) -> Result<(), Error> {
        const CONTEXT: &str = "MemoryRuntime::connect";

        let parse = |raw: &str| -> Result<Url, Error> {
            let url = Url::parse(raw.trim()).map_err(|e| {
                Error::new(StatusCode::InvalidUrl, CONTEXT, format!("'{raw}': {e}"))
            })?;
            if !matches!(url.scheme(), "tcp" | "ssl") || url.host_str().is_none() {
                return Err(Error::new(
                    StatusCode::InvalidUrl,
                    CONTEXT,
                    format!("'{raw}': expected tcp://host:port or ssl://host:port"),
                ));
            }
            Ok(url)
        };

        let server = parse(&self.options.server_url)?;
        for raw in urls.split(',') {
            let candidate = parse(raw)?;
            if candidate.host_str() == server.host_str() && candidate.port() == server.port() {
                return Ok(());
            }
        }

        Err(Error::new(
            StatusCode::ServerNotConnected,
            CONTEXT,
            format!("no server listening at {urls}"),
        ))
    }

    pub fn authenticate(&self, credentials: &Credentials) -> Result<(), Error> {
        if self.options.users.is_empty() {
            return Ok(());
        }

        match self.options.users.get(&credentials.user_name) {
            Some(password) if *password == credentials.password => Ok(()),
            _ => Err(Error::new(
                StatusCode::SecurityException,
                "MemoryRuntime::connect",
                format!("authentication failed for user '{}'", credentials.user_name),
            )),
        }
    }

    /// Checks a destination used for sending.
    pub fn check_send_target(
        &self,
        destination: &Destination,
        context: &'static str,
    ) -> Result<(), Error> {
        validate_name(destination.name(), false, context)?;
        self.state.lock().check_temporary(destination, context)
    }

    pub fn publish(&self, destination: &Destination, message: &Message) -> Result<(), Error> {
        const CONTEXT: &str = "MemoryProducer::send";

        validate_name(destination.name(), false, CONTEXT)?;
        let mut state = self.state.lock();
        state.check_temporary(destination, CONTEXT)?;

        match destination.kind() {
            DestinationKind::Queue => {
                let queue = state.queue(destination.name(), self.options.max_pending);
                if queue.mailbox.push(message.clone()) == Push::Full {
                    return Err(Error::new(
                        StatusCode::LimitExceeded,
                        CONTEXT,
                        format!("queue '{}' is full", destination.name()),
                    ));
                }
            }
            DestinationKind::Topic => {
                for subscriber in &state.topic_subscribers {
                    if topic_matches(&subscriber.pattern, destination.name())
                        && subscriber.selector.matches(message)
                        && subscriber.mailbox.push_evicting(message.clone()) == Push::Evicted
                    {
                        warn!(
                            topic = destination.name(),
                            "subscriber backlog full, dropped oldest message"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    pub fn attach(
        &self,
        destination: &Destination,
        kind: &ConsumerKind,
    ) -> Result<Attachment, Error> {
        const CONTEXT: &str = "MemoryChannel::create_consumer";

        let (subscription_kind, name, selector) = match kind {
            ConsumerKind::Plain => return self.attach_plain(destination),
            ConsumerKind::Durable { name, selector } => (SubscriptionKind::Durable, name, selector),
            ConsumerKind::Shared { name, selector } => (SubscriptionKind::Shared, name, selector),
            ConsumerKind::SharedDurable { name, selector } => {
                (SubscriptionKind::SharedDurable, name, selector)
            }
        };

        if !destination.is_topic() {
            return Err(Error::new(
                StatusCode::InvalidDestination,
                CONTEXT,
                format!("{} subscriptions require a topic", subscription_kind.describe()),
            ));
        }
        if name.is_empty() {
            return Err(Error::new(
                StatusCode::IllegalState,
                CONTEXT,
                "subscription name is empty",
            ));
        }
        validate_name(destination.name(), true, CONTEXT)?;
        let compiled = Selector::parse(selector)
            .map_err(|e| Error::new(StatusCode::InvalidSelector, CONTEXT, e.to_string()))?;

        let mut state = self.state.lock();

        if let Some(existing) = state.subscriptions.get_mut(name) {
            if existing.kind != subscription_kind {
                return Err(Error::new(
                    StatusCode::IllegalState,
                    CONTEXT,
                    format!(
                        "subscription '{name}' already exists as a {} subscription",
                        existing.kind.describe()
                    ),
                ));
            }

            let unchanged =
                existing.topic == destination.name() && existing.selector == compiled.source();
            if unchanged {
                if existing.kind == SubscriptionKind::Durable && existing.active > 0 {
                    return Err(Error::new(
                        StatusCode::IllegalState,
                        CONTEXT,
                        format!("durable subscription '{name}' already has an active consumer"),
                    ));
                }
                existing.active += 1;
                debug!(subscription = %name, active = existing.active, "resumed subscription");
                return Ok(Attachment {
                    target: Target::Subscription(name.clone()),
                    mailbox: existing.mailbox.clone(),
                });
            }

            if existing.active > 0 {
                return Err(Error::new(
                    StatusCode::IllegalState,
                    CONTEXT,
                    format!("subscription '{name}' is in use with a different topic or selector"),
                ));
            }

            let stale = existing.subscriber_id;
            state.subscriptions.remove(name);
            state.remove_subscriber(stale);
            debug!(subscription = %name, "replaced subscription with new topic or selector");
        }

        let mailbox = Arc::new(Mailbox::new(self.options.max_pending));
        let subscriber_id = Uuid::new_v4();
        state.topic_subscribers.push(TopicSubscriber {
            id: subscriber_id,
            pattern: destination.name().to_string(),
            selector: compiled.clone(),
            mailbox: mailbox.clone(),
        });
        state.subscriptions.insert(
            name.clone(),
            NamedSubscription {
                kind: subscription_kind,
                topic: destination.name().to_string(),
                selector: compiled.source().to_string(),
                subscriber_id,
                mailbox: mailbox.clone(),
                active: 1,
            },
        );
        debug!(
            subscription = %name,
            topic = destination.name(),
            "created {} subscription",
            subscription_kind.describe()
        );

        Ok(Attachment {
            target: Target::Subscription(name.clone()),
            mailbox,
        })
    }

    fn attach_plain(&self, destination: &Destination) -> Result<Attachment, Error> {
        const CONTEXT: &str = "MemoryChannel::create_consumer";

        match destination.kind() {
            DestinationKind::Queue => {
                validate_name(destination.name(), false, CONTEXT)?;
                let mut state = self.state.lock();
                state.check_temporary(destination, CONTEXT)?;
                let queue = state.queue(destination.name(), self.options.max_pending);
                queue.consumers += 1;
                Ok(Attachment {
                    target: Target::Queue(destination.name().to_string()),
                    mailbox: queue.mailbox.clone(),
                })
            }
            DestinationKind::Topic => {
                validate_name(destination.name(), true, CONTEXT)?;
                let id = Uuid::new_v4();
                let mailbox = Arc::new(Mailbox::new(self.options.max_pending));
                self.state.lock().topic_subscribers.push(TopicSubscriber {
                    id,
                    pattern: destination.name().to_string(),
                    selector: Selector::default(),
                    mailbox: mailbox.clone(),
                });
                Ok(Attachment {
                    target: Target::Topic(id),
                    mailbox,
                })
            }
        }
    }

    pub fn detach(&self, attachment: &Attachment) {
        let mut state = self.state.lock();
        match &attachment.target {
            Target::Queue(name) => {
                if let Some(queue) = state.queues.get_mut(name) {
                    queue.consumers = queue.consumers.saturating_sub(1);
                }
                state.prune_queue(name);
            }
            Target::Topic(id) => state.remove_subscriber(*id),
            Target::Subscription(name) => {
                let Some(subscription) = state.subscriptions.get_mut(name) else {
                    return;
                };
                subscription.active = subscription.active.saturating_sub(1);
                if subscription.kind == SubscriptionKind::Shared && subscription.active == 0 {
                    let id = subscription.subscriber_id;
                    state.subscriptions.remove(name);
                    state.remove_subscriber(id);
                    debug!(subscription = %name, "removed shared subscription");
                }
            }
        }
    }

    pub fn unsubscribe(&self, name: &str) -> Result<(), Error> {
        const CONTEXT: &str = "MemoryChannel::unsubscribe";

        let mut state = self.state.lock();
        let Some(subscription) = state.subscriptions.get(name) else {
            return Err(Error::new(
                StatusCode::NotFound,
                CONTEXT,
                format!("subscription '{name}' does not exist"),
            ));
        };

        if subscription.active > 0 {
            return Err(Error::new(
                StatusCode::IllegalState,
                CONTEXT,
                format!(
                    "subscription '{name}' has {} active consumer(s)",
                    subscription.active
                ),
            ));
        }

        let id = subscription.subscriber_id;
        subscription.mailbox.clear();
        state.subscriptions.remove(name);
        state.remove_subscriber(id);
        debug!(subscription = %name, "unsubscribed");

        Ok(())
    }

    pub fn create_temporary_queue(&self) -> (Destination, Arc<Mailbox>) {
        let name = format!("{TEMPORARY_PREFIX}{}", Uuid::new_v4().simple());
        let mailbox = Arc::new(Mailbox::new(self.options.max_pending));
        let mut state = self.state.lock();
        state.temporary.insert(name.clone());
        state.queues.insert(
            name.clone(),
            Queue {
                mailbox: mailbox.clone(),
                consumers: 0,
            },
        );
        (Destination::queue(name), mailbox)
    }

    pub fn delete_temporary_queue(&self, destination: &Destination) {
        let mut state = self.state.lock();
        state.temporary.remove(destination.name());
        state.queues.remove(destination.name());
    }

    /// Number of messages waiting in a named subscription.
    pub fn pending(&self, subscription_name: &str) -> Option<usize> {
        self.state
            .lock()
            .subscriptions
            .get(subscription_name)
            .map(|subscription| subscription.mailbox.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use courier_messaging::RuntimeError;

    fn broker() -> Broker {
        Broker::new(MemoryRuntimeOptions::default())
    }

    fn durable(name: &str, selector: &str) -> ConsumerKind {
        ConsumerKind::Durable {
            name: name.to_string(),
            selector: selector.to_string(),
        }
    }

    #[test]
    fn test_topic_matching() {
        assert!(topic_matches("a.b.c", "a.b.c"));
        assert!(topic_matches("a.*.c", "a.b.c"));
        assert!(topic_matches("a.>", "a.b.c"));
        assert!(!topic_matches("a.>", "a"));
        assert!(!topic_matches("a.*", "a.b.c"));
        assert!(!topic_matches("a.b", "a.b.c"));
        assert!(!topic_matches("a.b.c", "a.b"));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("test.request", false, "t").is_ok());
        assert!(validate_name("test.*", true, "t").is_ok());
        assert!(validate_name("test.*", false, "t").is_err());
        assert!(validate_name("test.>.x", true, "t").is_err());
        assert!(validate_name("te*st", true, "t").is_err());
        assert!(validate_name("a..b", true, "t").is_err());
        assert!(validate_name("", true, "t").is_err());
    }

    #[test]
    fn test_resolve() {
        let broker = broker();
        assert!(broker.resolve("tcp://localhost:7222").is_ok());
        assert!(broker.resolve("tcp://elsewhere:7222, tcp://localhost:7222").is_ok());
        assert_matches!(
            broker.resolve("tcp://localhost:7243").map_err(|e| e.status()),
            Err(StatusCode::ServerNotConnected)
        );
        assert_matches!(
            broker.resolve("http://localhost:7222").map_err(|e| e.status()),
            Err(StatusCode::InvalidUrl)
        );
        assert_matches!(
            broker.resolve("not a url").map_err(|e| e.status()),
            Err(StatusCode::InvalidUrl)
        );
    }

    #[test]
    fn test_topic_fan_out_and_wildcards() {
        let broker = broker();
        let plain = |name: &str| {
            broker
                .attach(&Destination::topic(name), &ConsumerKind::Plain)
                .unwrap()
        };
        let exact = plain("orders.eu");
        let wildcard = plain("orders.*");
        let other = plain("invoices");

        broker.publish(&Destination::topic("orders.eu"), &Message::text("one")).unwrap();

        assert_eq!(exact.mailbox.len(), 1);
        assert_eq!(wildcard.mailbox.len(), 1);
        assert_eq!(other.mailbox.len(), 0);

        broker.detach(&exact);
        broker.publish(&Destination::topic("orders.eu"), &Message::text("two")).unwrap();
        assert_eq!(exact.mailbox.len(), 1);
        assert_eq!(wildcard.mailbox.len(), 2);
    }

    #[test]
    fn test_publish_rejects_wildcards() {
        let broker = broker();
        assert_matches!(
            broker
                .publish(&Destination::topic("orders.*"), &Message::text("x"))
                .map_err(|e| e.status()),
            Err(StatusCode::InvalidDestination)
        );
    }

    #[test]
    fn test_queue_limit() {
        let broker = Broker::new(MemoryRuntimeOptions {
            max_pending: 1,
            ..MemoryRuntimeOptions::default()
        });
        let queue = Destination::queue("work");
        broker.publish(&queue, &Message::text("1")).unwrap();
        assert_matches!(
            broker.publish(&queue, &Message::text("2")).map_err(|e| e.status()),
            Err(StatusCode::LimitExceeded)
        );
    }

    #[test]
    fn test_durable_keeps_backlog_while_detached() {
        let broker = broker();
        let topic = Destination::topic("prices");
        let attachment = broker.attach(&topic, &durable("audit", "")).unwrap();
        broker.detach(&attachment);

        broker.publish(&topic, &Message::text("1")).unwrap();
        broker.publish(&topic, &Message::text("2")).unwrap();
        assert_eq!(broker.pending("audit"), Some(2));

        let resumed = broker.attach(&topic, &durable("audit", "")).unwrap();
        assert_eq!(resumed.mailbox.try_pop(), Some(Message::text("1")));
    }

    #[test]
    fn test_durable_single_active_consumer() {
        let broker = broker();
        let topic = Destination::topic("prices");
        let _first = broker.attach(&topic, &durable("audit", "")).unwrap();
        assert_matches!(
            broker.attach(&topic, &durable("audit", "")).map_err(|e| e.status()),
            Err(StatusCode::IllegalState)
        );
    }

    #[test]
    fn test_durable_selector_change_replaces_subscription() {
        let broker = broker();
        let topic = Destination::topic("prices");
        let attachment = broker.attach(&topic, &durable("audit", "")).unwrap();
        broker.detach(&attachment);
        broker.publish(&topic, &Message::text("stale")).unwrap();

        let replaced = broker.attach(&topic, &durable("audit", "kind = 'fresh'")).unwrap();
        assert_eq!(replaced.mailbox.len(), 0);

        broker.publish(&topic, &Message::text("a").with_property("kind", "fresh")).unwrap();
        broker.publish(&topic, &Message::text("b").with_property("kind", "old")).unwrap();
        assert_eq!(broker.pending("audit"), Some(1));
    }

    #[test]
    fn test_shared_subscription_removed_with_last_consumer() {
        let broker = broker();
        let topic = Destination::topic("jobs");
        let kind = ConsumerKind::Shared {
            name: "workers".to_string(),
            selector: String::new(),
        };
        let first = broker.attach(&topic, &kind).unwrap();
        let second = broker.attach(&topic, &kind).unwrap();
        assert!(Arc::ptr_eq(&first.mailbox, &second.mailbox));

        broker.detach(&first);
        assert_eq!(broker.pending("workers"), Some(0));
        broker.detach(&second);
        assert_eq!(broker.pending("workers"), None);
    }

    #[test]
    fn test_kind_collision() {
        let broker = broker();
        let topic = Destination::topic("jobs");
        let _durable = broker.attach(&topic, &durable("name", "")).unwrap();
        let shared = ConsumerKind::SharedDurable {
            name: "name".to_string(),
            selector: String::new(),
        };
        assert_matches!(
            broker.attach(&topic, &shared).map_err(|e| e.status()),
            Err(StatusCode::IllegalState)
        );
    }

    #[test]
    fn test_unsubscribe_rules() {
        let broker = broker();
        let topic = Destination::topic("prices");
        assert_matches!(
            broker.unsubscribe("audit").map_err(|e| e.status()),
            Err(StatusCode::NotFound)
        );

        let attachment = broker.attach(&topic, &durable("audit", "")).unwrap();
        assert_matches!(
            broker.unsubscribe("audit").map_err(|e| e.status()),
            Err(StatusCode::IllegalState)
        );

        broker.detach(&attachment);
        broker.unsubscribe("audit").unwrap();
        assert_eq!(broker.pending("audit"), None);
    }

    #[test]
    fn test_invalid_selector() {
        let broker = broker();
        assert_matches!(
            broker
                .attach(&Destination::topic("prices"), &durable("audit", "price >"))
                .map_err(|e| e.status()),
            Err(StatusCode::InvalidSelector)
        );
    }

    #[test]
    fn test_named_subscription_requires_topic() {
        let broker = broker();
        assert_matches!(
            broker
                .attach(&Destination::queue("prices"), &durable("audit", ""))
                .map_err(|e| e.status()),
            Err(StatusCode::InvalidDestination)
        );
    }

    #[test]
    fn test_temporary_queue_lifecycle() {
        let broker = broker();
        let (destination, _mailbox) = broker.create_temporary_queue();
        broker.publish(&destination, &Message::text("reply")).unwrap();

        broker.delete_temporary_queue(&destination);
        assert_matches!(
            broker.publish(&destination, &Message::text("late")).map_err(|e| e.status()),
            Err(StatusCode::InvalidDestination)
        );
    }

    #[test]
    fn test_idle_queue_is_pruned() {
        let broker = broker();
        let queue = Destination::queue("scratch");
        let has_queue = |broker: &Broker| broker.state.lock().queues.contains_key("scratch");

        let attachment = broker.attach(&queue, &ConsumerKind::Plain).unwrap();
        broker.publish(&queue, &Message::text("kept")).unwrap();
        broker.detach(&attachment);
        assert!(has_queue(&broker));

        let attachment = broker.attach(&queue, &ConsumerKind::Plain).unwrap();
        assert_eq!(attachment.mailbox.try_pop(), Some(Message::text("kept")));
        broker.detach(&attachment);
        assert!(!has_queue(&broker));
    }

    #[test]
    fn test_queue_kept_while_consumers_remain() {
        let broker = broker();
        let queue = Destination::queue("shared");
        let first = broker.attach(&queue, &ConsumerKind::Plain).unwrap();
        let second = broker.attach(&queue, &ConsumerKind::Plain).unwrap();

        broker.detach(&first);
        broker.publish(&queue, &Message::text("still read")).unwrap();
        assert_eq!(second.mailbox.try_pop(), Some(Message::text("still read")));

        broker.detach(&second);
        assert!(broker.state.lock().queues.is_empty());
    }

    #[test]
    fn test_reply_to_deleted_temporary_queue_leaves_nothing_behind() {
        let broker = broker();
        let (destination, _mailbox) = broker.create_temporary_queue();
        broker.delete_temporary_queue(&destination);

        assert_matches!(
            broker
                .publish(&destination, &Message::text("late reply"))
                .map_err(|e| e.status()),
            Err(StatusCode::InvalidDestination)
        );
        assert!(broker.state.lock().queues.is_empty());
        assert_matches!(
            broker
                .attach(&destination, &ConsumerKind::Plain)
                .map_err(|e| e.status()),
            Err(StatusCode::InvalidDestination)
        );
    }
}
