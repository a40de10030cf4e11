//! Abstract interface for a message-bus runtime.
//!
//! The traits here describe everything a client facade needs from a bus:
//! connections, channels, destinations, producers, consumers, requestors and
//! push listeners. Implementations translate these calls into whatever their
//! transport does.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Channels create producers, consumers and requestors.
pub mod channel;

/// Connections are authenticated links to a bus.
pub mod connection;

/// Consumers receive messages from destinations.
pub mod consumer;

/// Destinations are named topics or queues.
pub mod destination;

/// Listeners receive messages pushed by consumers.
pub mod listener;

/// Messages and their bodies.
pub mod message;

/// Producers send messages to destinations.
pub mod producer;

/// Requestors send a request and wait for its reply.
pub mod requestor;

/// Runtimes open connections.
pub mod runtime;

/// Status codes reported by runtimes.
pub mod status;

pub use channel::{AcknowledgeMode, Channel};
pub use connection::Connection;
pub use consumer::{Consumer, ConsumerKind};
pub use destination::{Destination, DestinationKind};
pub use listener::MessageListener;
pub use message::{
    Body, BodyKind, FieldError, MapBody, MapValue, Message, PropertyValue, UnknownBodyKind,
};
pub use producer::Producer;
pub use requestor::Requestor;
pub use runtime::{Credentials, Runtime, RuntimeError};
pub use status::StatusCode;
