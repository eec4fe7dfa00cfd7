//! Listener slots for book notifications
//!
//! A book holds three optional callbacks plus opaque user data. All of them
//! are invoked synchronously on the delivery thread, **with the book's lock
//! held**. A listener must not call back into the same book (close it,
//! replace its listeners, query it): that deadlocks.
//!
//! # Example
//!
//! ```
//! use depthfeed_client::listeners::BookListeners;
//!
//! let listeners = BookListeners::new()
//!     .on_new_book(|window| {
//!         println!("{}: {} asks, {} bids", window.symbol, window.asks.len(), window.bids.len());
//!     })
//!     .on_incremental_change(|diff| {
//!         println!("{}: {:?}", diff.symbol, diff.changes.removals);
//!     });
//! ```

use depthfeed_book::BookChanges;
use depthfeed_types::PriceLevel;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque caller state handed back to every listener
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Full visible window of a book
#[derive(Clone, Copy)]
pub struct BookWindow<'a> {
    /// Instrument symbol
    pub symbol: &'a str,
    /// Liquidity source
    pub source: &'a str,
    /// Visible asks, best first
    pub asks: &'a [PriceLevel],
    /// Visible bids, best first
    pub bids: &'a [PriceLevel],
    user_data: Option<&'a UserData>,
}

impl<'a> BookWindow<'a> {
    pub(crate) fn new(
        symbol: &'a str,
        source: &'a str,
        asks: &'a [PriceLevel],
        bids: &'a [PriceLevel],
        user_data: Option<&'a UserData>,
    ) -> Self {
        Self {
            symbol,
            source,
            asks,
            bids,
            user_data,
        }
    }

    /// User data, if set and of type `T`
    pub fn user_data<T: Any>(&self) -> Option<&'a T> {
        self.user_data.and_then(|data| data.downcast_ref::<T>())
    }
}

/// Incremental change to a book's visible window
#[derive(Clone, Copy)]
pub struct BookDiff<'a> {
    /// Instrument symbol
    pub symbol: &'a str,
    /// Liquidity source
    pub source: &'a str,
    /// Removals, additions and updates per side
    pub changes: &'a BookChanges,
    user_data: Option<&'a UserData>,
}

impl<'a> BookDiff<'a> {
    pub(crate) fn new(
        symbol: &'a str,
        source: &'a str,
        changes: &'a BookChanges,
        user_data: Option<&'a UserData>,
    ) -> Self {
        Self {
            symbol,
            source,
            changes,
            user_data,
        }
    }

    /// User data, if set and of type `T`
    pub fn user_data<T: Any>(&self) -> Option<&'a T> {
        self.user_data.and_then(|data| data.downcast_ref::<T>())
    }
}

/// Type aliases for listener callbacks
pub type NewBookListener = Arc<dyn Fn(&BookWindow<'_>) + Send + Sync>;
pub type BookUpdateListener = Arc<dyn Fn(&BookWindow<'_>) + Send + Sync>;
pub type IncrementalChangeListener = Arc<dyn Fn(&BookDiff<'_>) + Send + Sync>;

/// Listener container for one book
///
/// All listeners are optional. Keep them fast; they run on the delivery
/// thread under the book's lock. The user data travels with the listeners
/// so both are published to a book in one step.
#[derive(Default, Clone)]
pub struct BookListeners {
    /// Called after a snapshot batch with the full window
    pub(crate) on_new_book: Option<NewBookListener>,
    /// Called after a changing incremental batch with the full window
    pub(crate) on_book_update: Option<BookUpdateListener>,
    /// Called after a changing incremental batch with the diff
    pub(crate) on_incremental_change: Option<IncrementalChangeListener>,
    /// Handed back to every listener
    pub(crate) user_data: Option<UserData>,
}

impl fmt::Debug for BookListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookListeners")
            .field("on_new_book", &self.on_new_book.as_ref().map(|_| "..."))
            .field("on_book_update", &self.on_book_update.as_ref().map(|_| "..."))
            .field(
                "on_incremental_change",
                &self.on_incremental_change.as_ref().map(|_| "..."),
            )
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}

impl BookListeners {
    /// Create an empty listener container
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for new books
    ///
    /// Fires after every snapshot batch, even when both sides are empty.
    pub fn on_new_book<F>(mut self, f: F) -> Self
    where
        F: Fn(&BookWindow<'_>) + Send + Sync + 'static,
    {
        self.on_new_book = Some(Arc::new(f));
        self
    }

    /// Register a callback for book updates
    ///
    /// Fires after an incremental batch that changed the visible window,
    /// right after the incremental-change callback. Receives the full window.
    pub fn on_book_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&BookWindow<'_>) + Send + Sync + 'static,
    {
        self.on_book_update = Some(Arc::new(f));
        self
    }

    /// Register a callback for incremental changes
    ///
    /// Fires after an incremental batch that changed the visible window.
    pub fn on_incremental_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&BookDiff<'_>) + Send + Sync + 'static,
    {
        self.on_incremental_change = Some(Arc::new(f));
        self
    }

    /// Attach opaque user data
    pub fn with_user_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.user_data = Some(Arc::new(data));
        self
    }

    /// Check if no listener is registered
    pub fn is_empty(&self) -> bool {
        self.on_new_book.is_none()
            && self.on_book_update.is_none()
            && self.on_incremental_change.is_none()
    }

    pub(crate) fn invoke_new_book(&self, window: &BookWindow<'_>) {
        if let Some(ref listener) = self.on_new_book {
            listener(window);
        }
    }

    pub(crate) fn invoke_book_update(&self, window: &BookWindow<'_>) {
        if let Some(ref listener) = self.on_book_update {
            listener(window);
        }
    }

    pub(crate) fn invoke_incremental_change(&self, diff: &BookDiff<'_>) {
        if let Some(ref listener) = self.on_incremental_change {
            listener(diff);
        }
    }
}
