//! Thread-safe book bound to an order channel subscription
//!
//! A [`Book`] wraps a [`DepthBook`] and its listeners in one mutex. Batches
//! arrive on the channel's delivery thread, are applied under the lock, and
//! listeners are invoked before the lock is released.

use crate::channel::{BatchListener, ListenerId, OrderChannel};
use crate::listeners::{BookDiff, BookListeners, BookWindow, UserData};
use depthfeed_book::{BatchOutcome, BookSnapshot, BookState, DepthBook};
use depthfeed_types::{BookSide, FeedError, PriceLevel, RawOrderEvent, SubscriptionKey};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// State guarded by the book lock
struct BookInner {
    core: DepthBook,
    listeners: BookListeners,
    subscription: Option<ListenerId>,
}

/// One live order book
pub struct Book {
    key: SubscriptionKey,
    depth: u32,
    channel: Arc<dyn OrderChannel>,
    inner: Mutex<BookInner>,
}

impl std::fmt::Debug for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("key", &self.key)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Book {
    /// Create a book and subscribe it to `channel`
    ///
    /// The channel listener holds only a weak reference, so dropping the
    /// last `Arc<Book>` stops delivery even without an explicit close.
    pub fn open(
        key: SubscriptionKey,
        depth: u32,
        listeners: BookListeners,
        channel: Arc<dyn OrderChannel>,
    ) -> Result<Arc<Self>, FeedError> {
        let book = Arc::new(Self {
            key: key.clone(),
            depth,
            channel: channel.clone(),
            inner: Mutex::new(BookInner {
                core: DepthBook::new(key.clone(), depth),
                listeners,
                subscription: None,
            }),
        });

        let weak: Weak<Self> = Arc::downgrade(&book);
        let listener: BatchListener = Arc::new(move |events, is_new_snapshot| {
            if let Some(book) = weak.upgrade() {
                if let Err(e) = book.process_batch(events, is_new_snapshot) {
                    debug!(key = %book.key, error = %e, "Batch dropped");
                }
            }
        });

        let id = channel.subscribe(&key, listener)?;
        book.inner.lock().subscription = Some(id);
        Ok(book)
    }

    /// Apply one batch and notify listeners
    ///
    /// Normally called by the order channel. Listeners run before this
    /// returns, with the lock held.
    pub fn process_batch(
        &self,
        events: &[RawOrderEvent],
        is_new_snapshot: bool,
    ) -> Result<(), FeedError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let outcome = inner.core.process_batch(events, is_new_snapshot)?;

        let symbol = self.key.symbol.as_str();
        let source = self.key.source.as_str();
        let listeners = &inner.listeners;
        let user_data = listeners.user_data.as_ref();

        match outcome {
            BatchOutcome::NewBook => {
                if listeners.on_new_book.is_some() {
                    let asks = inner.core.visible_asks();
                    let bids = inner.core.visible_bids();
                    let window = BookWindow::new(symbol, source, &asks, &bids, user_data);
                    listeners.invoke_new_book(&window);
                }
            }
            BatchOutcome::Changed(changes) => {
                let diff = BookDiff::new(symbol, source, &changes, user_data);
                listeners.invoke_incremental_change(&diff);

                if listeners.on_book_update.is_some() {
                    let asks = inner.core.visible_asks();
                    let bids = inner.core.visible_bids();
                    let window = BookWindow::new(symbol, source, &asks, &bids, user_data);
                    listeners.invoke_book_update(&window);
                }
            }
            BatchOutcome::Unchanged => {}
        }
        Ok(())
    }

    /// Replace all listeners and user data at once
    pub fn set_listeners(&self, listeners: BookListeners) -> Result<(), FeedError> {
        self.update_listeners(|slot| *slot = listeners)
    }

    /// Replace the new-book listener
    pub fn set_on_new_book<F>(&self, f: F) -> Result<(), FeedError>
    where
        F: Fn(&BookWindow<'_>) + Send + Sync + 'static,
    {
        self.update_listeners(|slot| slot.on_new_book = Some(Arc::new(f)))
    }

    /// Replace the book-update listener
    pub fn set_on_book_update<F>(&self, f: F) -> Result<(), FeedError>
    where
        F: Fn(&BookWindow<'_>) + Send + Sync + 'static,
    {
        self.update_listeners(|slot| slot.on_book_update = Some(Arc::new(f)))
    }

    /// Replace the incremental-change listener
    pub fn set_on_incremental_change<F>(&self, f: F) -> Result<(), FeedError>
    where
        F: Fn(&BookDiff<'_>) + Send + Sync + 'static,
    {
        self.update_listeners(|slot| slot.on_incremental_change = Some(Arc::new(f)))
    }

    /// Replace the user data
    pub fn set_user_data<T: Any + Send + Sync>(&self, data: T) -> Result<(), FeedError> {
        let data: UserData = Arc::new(data);
        self.update_listeners(|slot| slot.user_data = Some(data))
    }

    fn update_listeners(&self, f: impl FnOnce(&mut BookListeners)) -> Result<(), FeedError> {
        let mut inner = self.inner.lock();
        if inner.core.is_closed() {
            return Err(self.closed_error());
        }
        f(&mut inner.listeners);
        Ok(())
    }

    /// Close the book and release its subscription
    ///
    /// Returns false if the book was already closed. Waits for an
    /// in-flight batch to finish. Must not be called from a listener of
    /// this book.
    pub fn close(&self) -> bool {
        let subscription = {
            let mut inner = self.inner.lock();
            if inner.core.is_closed() {
                return false;
            }
            inner.core.close();
            inner.listeners = BookListeners::default();
            inner.subscription.take()
        };

        // Unsubscribe outside the lock: the channel may be waiting on it
        if let Some(id) = subscription {
            self.channel.unsubscribe(id);
        }
        info!(key = %self.key, "Book closed");
        true
    }

    fn closed_error(&self) -> FeedError {
        FeedError::BookClosed {
            key: self.key.to_string(),
        }
    }

    fn with_core<R>(&self, f: impl FnOnce(&DepthBook) -> R) -> R {
        f(&self.inner.lock().core)
    }

    /// Subscription key
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Symbol
    pub fn symbol(&self) -> &str {
        self.key.symbol.as_str()
    }

    /// Source
    pub fn source(&self) -> &str {
        self.key.source.as_str()
    }

    /// Visible depth per side (0 = unbounded)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Current state
    pub fn state(&self) -> BookState {
        self.with_core(DepthBook::state)
    }

    /// Check if the book has been closed
    pub fn is_closed(&self) -> bool {
        self.with_core(DepthBook::is_closed)
    }

    /// Visible asks, best first
    pub fn visible_asks(&self) -> Vec<PriceLevel> {
        self.with_core(DepthBook::visible_asks)
    }

    /// Visible bids, best first
    pub fn visible_bids(&self) -> Vec<PriceLevel> {
        self.with_core(DepthBook::visible_bids)
    }

    /// Best bid
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.with_core(|core| core.best_bid().copied())
    }

    /// Best ask
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.with_core(|core| core.best_ask().copied())
    }

    /// Spread (ask - bid)
    pub fn spread(&self) -> Option<f64> {
        self.with_core(DepthBook::spread)
    }

    /// Mid price
    pub fn mid_price(&self) -> Option<f64> {
        self.with_core(DepthBook::mid_price)
    }

    /// Checksum of the visible window
    pub fn checksum(&self) -> u32 {
        self.with_core(DepthBook::checksum)
    }

    /// Number of live orders
    pub fn order_count(&self) -> usize {
        self.with_core(DepthBook::order_count)
    }

    /// Number of levels stored on a side, visible or not
    pub fn stored_level_count(&self, side: BookSide) -> usize {
        self.with_core(|core| core.stored_level_count(side))
    }

    /// Deltas absorbed as defensive no-ops
    pub fn anomalies(&self) -> u64 {
        self.with_core(DepthBook::anomalies)
    }

    /// Capture the visible window
    pub fn snapshot(&self) -> BookSnapshot {
        self.with_core(DepthBook::snapshot)
    }
}

impl Drop for Book {
    fn drop(&mut self) {
        if let Some(id) = self.inner.get_mut().subscription.take() {
            self.channel.unsubscribe(id);
        }
    }
}
