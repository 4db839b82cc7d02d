//! Fan-out of classified messages to any number of consumers.
//!
//! Each subscriber owns an unbounded queue, so `publish` never waits on a
//! slow consumer. There is no replay buffer: a subscriber only sees
//! messages published after it subscribed.

use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::types::{Message, MessageKind};

type Filter = Box<dyn Fn(&Message) -> bool + Send + Sync>;

struct Subscriber {
    tx: mpsc::UnboundedSender<Message>,
    filter: Option<Filter>,
}

impl Subscriber {
    fn wants(&self, message: &Message) -> bool {
        self.filter.as_ref().map_or(true, |f| f(message))
    }
}

#[derive(Default)]
pub struct Publisher {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` to every live subscriber whose filter accepts it.
    /// Returns how many subscribers received it. Subscribers whose
    /// [`Subscription`] was dropped are pruned here.
    pub fn publish(&self, message: Message) -> usize {
        let mut subscribers = self.lock();
        let mut delivered = 0;
        subscribers.retain(|sub| {
            if sub.tx.is_closed() {
                return false;
            }
            if !sub.wants(&message) {
                return true;
            }
            let alive = sub.tx.send(message.clone()).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });
        delivered
    }

    pub fn subscribe(&self) -> Subscription {
        self.register(None)
    }

    pub fn subscribe_kind(&self, kind: MessageKind) -> Subscription {
        self.register(Some(Box::new(move |m: &Message| m.kind() == kind)))
    }

    pub fn subscribe_filtered<F>(&self, predicate: F) -> Subscription
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.register(Some(Box::new(predicate)))
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().iter().filter(|s| !s.tx.is_closed()).count()
    }

    fn register(&self, filter: Option<Filter>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(Subscriber { tx, filter });
        Subscription { rx }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        // The guarded Vec stays consistent even if a filter panicked.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One consumer's delivery cursor. Dropping it unsubscribes.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    /// Wait for the next message. Returns `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
