//! Payload-free "something changed" stream published by the persistence layer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

pub type SubscriptionId = u64;

/// Which table set moved. Informational only; subscribers re-read everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Trackers,
    Categories,
    Records,
    Settings,
}

type Callback = Arc<dyn Fn(Change) + Send + Sync>;

#[derive(Default)]
pub struct ChangeFeed {
    subscribers: Mutex<BTreeMap<SubscriptionId, Callback>>,
    next_id: AtomicU64,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Change) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(id, Arc::new(callback));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Callbacks run after the subscriber lock is released, so they may
    /// subscribe or unsubscribe themselves.
    pub fn publish(&self, change: Change) {
        let callbacks: Vec<Callback> = self.subscribers.lock().values().cloned().collect();
        debug!(?change, subscribers = callbacks.len(), "publishing change");
        for callback in callbacks {
            callback(change);
        }
    }
}
