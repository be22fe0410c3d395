//! Typed event fan-out
//!
//! Each subscriber owns a bounded queue. [`EventFanout::publish`] waits for
//! room in every queue, so a slow subscriber slows the producer down rather
//! than losing events. Subscribers that dropped their receiver are pruned on
//! the next publish.

use log::debug;
use tokio::sync::mpsc;

/// Broadcasts cloned events to every live subscriber
#[derive(Debug)]
pub struct EventFanout<T> {
    subscribers: Vec<mpsc::Sender<T>>,
}

impl<T> Default for EventFanout<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> EventFanout<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber with its own queue of `capacity` events
    pub fn subscribe(&mut self, capacity: usize) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event to every subscriber, in subscription order.
    ///
    /// Returns the number of subscribers that received it.
    pub async fn publish(&mut self, event: T) -> usize {
        let mut delivered = 0;
        let mut closed = false;
        for tx in &self.subscribers {
            if tx.send(event.clone()).await.is_ok() {
                delivered += 1;
            } else {
                closed = true;
            }
        }
        if closed {
            self.subscribers.retain(|tx| !tx.is_closed());
            debug!(
                "Pruned closed subscribers, {} remaining",
                self.subscribers.len()
            );
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
