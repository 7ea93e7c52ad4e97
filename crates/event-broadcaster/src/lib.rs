//! Multi-subscriber fan-out of SSE payloads (spec.md §4.4).
//!
//! Two independent signaling paths live here, matching the two things
//! `Broadcast` and `Trigger` mean in spec.md:
//! - [`EventBroadcaster::broadcast`] pushes a payload to every subscriber's
//!   bounded channel, dropping it for any subscriber whose buffer (depth 10)
//!   is already full rather than blocking the producer loop.
//! - [`EventBroadcaster::trigger`] / [`EventBroadcaster::triggered`] is a
//!   level-triggered flag: it doesn't carry a payload, it just tells the
//!   producer loop "something changed, go compose a fresh snapshot and
//!   broadcast that instead". A `watch` channel gives us the level-trigger
//!   semantics (and coalescing) for free.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};

/// Per-subscriber channel depth (spec.md §4.4).
const SUBSCRIBER_BUFFER: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

pub struct EventBroadcaster<T> {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<T>>>,
    next_id: AtomicU64,
    trigger_tx: watch::Sender<()>,
}

impl<T> Default for EventBroadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBroadcaster<T> {
    pub fn new() -> Self {
        let (trigger_tx, _) = watch::channel(());
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            trigger_tx,
        }
    }

    /// Adds a subscriber with a buffer of 10 (spec.md §4.4).
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().unwrap().insert(id.0, tx);
        (id, rx)
    }

    /// Removes and implicitly closes a subscriber's channel (dropping the
    /// sender closes the receiver side).
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.lock().unwrap().remove(&id.0);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Sets the level-triggered flag. Producers read it via
    /// [`Self::triggered`]; multiple calls between reads collapse to one.
    pub fn trigger(&self) {
        let _ = self.trigger_tx.send(());
    }

    pub fn triggered(&self) -> watch::Receiver<()> {
        self.trigger_tx.subscribe()
    }
}

impl<T: Clone> EventBroadcaster<T> {
    /// Delivers `payload` to every current subscriber non-blockingly,
    /// dropping it for any whose buffer is full (spec.md §4.4).
    pub fn broadcast(&self, payload: T) {
        let subscribers = self.subscribers.lock().unwrap();
        for (id, tx) in subscribers.iter() {
            if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(payload.clone()) {
                tracing::warn!(subscriber_id = id, "dropping event for slow SSE subscriber");
            }
        }
    }
}
