use std::collections::VecDeque;

use courier_messaging::Message;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Outcome of pushing into a bounded mailbox.
#[derive(Debug, PartialEq, Eq)]
pub enum Push {
    Accepted,
    Full,
    /// The oldest message was dropped to make room.
    Evicted,
}

/// A FIFO of pending messages shared by every consumer of one queue or
/// subscription.
#[derive(Debug)]
pub struct Mailbox {
    capacity: usize,
    messages: Mutex<VecDeque<Message>>,
    notify: Notify,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Appends a message, refusing it when full.
    pub fn push(&self, message: Message) -> Push {
        {
            let mut messages = self.messages.lock();
            if messages.len() >= self.capacity {
                return Push::Full;
            }
            messages.push_back(message);
        }
        self.notify.notify_one();
        Push::Accepted
    }

    /// Appends a message, dropping the oldest one when full.
    pub fn push_evicting(&self, message: Message) -> Push {
        let outcome = {
            let mut messages = self.messages.lock();
            let outcome = if messages.len() >= self.capacity {
                messages.pop_front();
                Push::Evicted
            } else {
                Push::Accepted
            };
            messages.push_back(message);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    pub fn try_pop(&self) -> Option<Message> {
        self.messages.lock().pop_front()
    }

    /// Waits for and removes the next message.
    ///
    /// Cancel safe: a message is only removed when the future completes.
    pub async fn pop(&self) -> Message {
        loop {
            if let Some(message) = self.try_pop() {
                return message;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}
