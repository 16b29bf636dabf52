// Message-passing channel for push notifications.
//
// Purpose
// - Fan out change messages from a data source to any number of subscribers.
//
// Responsibilities
// - Deliver every published message to each live subscriber, in publish order.
// - Release a subscriber's slot when it unsubscribes or is dropped.
// - End every subscription when the channel is closed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Registry<T> {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<T>>,
}

pub struct ChangeChannel<T> {
    name: String,
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: Clone + Send + 'static> ChangeChannel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                senders: HashMap::new(),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.senders.insert(id, tx);
        tracing::debug!(channel = %self.name, subscription_id = id, "subscribed");
        Subscription {
            id,
            channel: self.name.clone(),
            receiver: rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Returns how many subscribers received the message.
    pub fn publish(&self, message: T) -> usize {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry
            .senders
            .retain(|_, tx| tx.send(message.clone()).is_ok());
        registry.senders.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .len()
    }

    /// Drops every sender so pending `recv` calls return `None`.
    pub fn close(&self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.senders.clear();
        tracing::debug!(channel = %self.name, "channel closed");
    }
}

pub struct Subscription<T> {
    id: u64,
    channel: String,
    receiver: mpsc::UnboundedReceiver<T>,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Subscription<T> {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// `None` once the channel is closed or released.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .senders
                .remove(&self.id);
            tracing::debug!(channel = %self.channel, subscription_id = self.id, "unsubscribed");
        }
    }
}

/// Background task draining a subscription. Stopping it, or dropping it,
/// drops the subscription and so releases its slot in the channel.
pub struct FeedWorker {
    task: JoinHandle<()>,
}

impl FeedWorker {
    pub fn spawn<T, F, Fut>(mut subscription: Subscription<T>, mut on_message: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let task = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                on_message(message).await;
            }
            tracing::debug!(channel = %subscription.channel(), "feed ended");
        });
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {}
}

impl Drop for FeedWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
