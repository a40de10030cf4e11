use crate::payload::decode;

use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use courier_messaging::{Message, MessageListener};
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Identifies a registered listener within its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Callback = Arc<dyn Fn(String) + Send + Sync>;

/// Callbacks of a session's listeners, keyed by id.
#[derive(Default)]
pub struct ListenerTable {
    callbacks: Mutex<HashMap<ListenerId, Callback>>,
}

impl ListenerTable {
    pub fn insert(&self, id: ListenerId, callback: Callback) {
        self.callbacks.lock().insert(id, callback);
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.callbacks.lock().remove(&id).is_some()
    }

    pub fn clear(&self) {
        self.callbacks.lock().clear();
    }

    fn get(&self, id: ListenerId) -> Option<Callback> {
        self.callbacks.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerTable")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Bridges runtime deliveries to the callback registered under `id`.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    id: ListenerId,
    table: Arc<ListenerTable>,
    debug: bool,
}

impl Dispatcher {
    pub const fn new(id: ListenerId, table: Arc<ListenerTable>, debug: bool) -> Self {
        Self { id, table, debug }
    }
}

#[async_trait]
impl MessageListener for Dispatcher {
    async fn on_message(&self, message: Message) {
        // Unregistered or session closed.
        let Some(callback) = self.table.get(self.id) else {
            return;
        };

        if self.debug {
            info!(listener = %self.id, "received {message}");
        }

        match decode(&message) {
            Ok(text) => callback(text),
            Err(e) => warn!(listener = %self.id, "dropping message: {e}"),
        }
    }
}
