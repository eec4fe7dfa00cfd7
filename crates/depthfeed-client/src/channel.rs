//! Order snapshot channel abstraction
//!
//! The channel is the upstream collaborator that decodes the wire protocol
//! and delivers batches of [`RawOrderEvent`]s per (symbol, source). Books
//! register one listener each when they are created and unregister it when
//! they are closed.
//!
//! Implementations must deliver batches for one subscription in order and
//! never concurrently with each other. Batches for different subscriptions
//! may run concurrently.

use dashmap::DashMap;
use depthfeed_types::{FeedError, RawOrderEvent, SubscriptionKey};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback receiving `(events, is_new_snapshot)`
pub type BatchListener = Arc<dyn Fn(&[RawOrderEvent], bool) + Send + Sync>;

/// Identifies one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw listener id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw listener id
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Trait for the upstream order channel
///
/// This lets books be driven by a real protocol layer or, in tests and
/// demos, by the in-process [`LocalOrderChannel`].
pub trait OrderChannel: Send + Sync {
    /// Register a listener for one (symbol, source)
    fn subscribe(
        &self,
        key: &SubscriptionKey,
        listener: BatchListener,
    ) -> Result<ListenerId, FeedError>;

    /// Remove a listener; unknown ids are ignored
    ///
    /// Once this returns, the listener is not invoked again.
    fn unsubscribe(&self, id: ListenerId);
}

/// In-process order channel
///
/// Batches handed to [`publish`](Self::publish) go straight to every
/// listener subscribed to the key, on the calling thread. Callers are
/// responsible for not publishing the same key from two threads at once.
#[derive(Default)]
pub struct LocalOrderChannel {
    /// Listeners by subscription key
    listeners: DashMap<SubscriptionKey, Vec<(ListenerId, BatchListener)>>,
    /// Listener id -> key, for unsubscribe
    index: DashMap<ListenerId, SubscriptionKey>,
    /// Next listener id
    next_id: AtomicU64,
    /// Refuse new subscriptions (simulates an unavailable feed)
    fail_subscriptions: AtomicBool,
}

impl LocalOrderChannel {
    /// Create a new channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new shared channel
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make subsequent subscriptions fail (or succeed again)
    pub fn set_fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::Relaxed);
    }

    /// Deliver a batch to every listener of `key`
    ///
    /// Returns the number of listeners that received it.
    pub fn publish(
        &self,
        key: &SubscriptionKey,
        events: &[RawOrderEvent],
        is_new_snapshot: bool,
    ) -> usize {
        // Clone listeners out so no map guard is held while they run
        let listeners: Vec<BatchListener> = match self.listeners.get(key) {
            Some(entry) => entry.iter().map(|(_, listener)| listener.clone()).collect(),
            None => {
                trace!(key = %key, "no listeners for batch");
                return 0;
            }
        };

        for listener in &listeners {
            listener(events, is_new_snapshot);
        }
        listeners.len()
    }

    /// Number of listeners subscribed to `key`
    pub fn listener_count(&self, key: &SubscriptionKey) -> usize {
        self.listeners.get(key).map_or(0, |entry| entry.len())
    }

    /// Total number of listeners across all keys
    pub fn total_listeners(&self) -> usize {
        self.index.len()
    }
}

impl OrderChannel for LocalOrderChannel {
    fn subscribe(
        &self,
        key: &SubscriptionKey,
        listener: BatchListener,
    ) -> Result<ListenerId, FeedError> {
        if self.fail_subscriptions.load(Ordering::Relaxed) {
            return Err(FeedError::SubscriptionFailed {
                key: key.to_string(),
                reason: "order channel unavailable".to_string(),
            });
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .entry(key.clone())
            .or_default()
            .push((id, listener));
        self.index.insert(id, key.clone());
        debug!(key = %key, listener = id.0, "Listener subscribed");
        Ok(id)
    }

    fn unsubscribe(&self, id: ListenerId) {
        let Some((_, key)) = self.index.remove(&id) else {
            return;
        };

        let now_empty = match self.listeners.get_mut(&key) {
            Some(mut entry) => {
                entry.retain(|(listener_id, _)| *listener_id != id);
                entry.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.listeners.remove_if(&key, |_, entry| entry.is_empty());
        }
        debug!(key = %key, listener = id.0, "Listener unsubscribed");
    }
}
