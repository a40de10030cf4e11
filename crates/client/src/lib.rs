//! A small client facade over a message-bus runtime.
//!
//! A [`Session`] owns one connection and one channel and offers send,
//! receive with timeout, request/reply, push listeners and durable or shared
//! subscription receives. Any runtime implementing
//! [`courier_messaging::Runtime`] can back it.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod listener;
mod payload;
mod session;

pub use config::{ConfigError, SessionConfig};
pub use error::{Error, StatusError};
pub use listener::ListenerId;
pub use payload::{Payload, decode};
pub use session::Session;

pub use courier_messaging::{BodyKind, StatusCode};
