//! Feed connection and book registry
//!
//! A [`FeedConnection`] owns every book created through it. Books are
//! addressed by [`BookHandle`]s: a slot index plus the generation the slot
//! had when the book was created. Closing a book bumps its slot's
//! generation, so a stale handle is rejected instead of reaching whatever
//! book reuses the slot later.

use crate::book::Book;
use crate::channel::OrderChannel;
use crate::config::{BookConfig, ConnectionConfig};
use crate::listeners::BookListeners;
use depthfeed_types::{FeedError, Source, SubscriptionKey, Symbol};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Handle to a book owned by a [`FeedConnection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookHandle {
    index: u32,
    generation: u32,
}

impl BookHandle {
    /// Slot index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation at creation time
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn invalid(&self) -> FeedError {
        FeedError::InvalidHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

impl fmt::Display for BookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    book: Option<Arc<Book>>,
}

/// Slots plus a free list of vacant indices
#[derive(Default)]
struct BookRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl BookRegistry {
    fn get(&self, handle: BookHandle) -> Option<&Arc<Book>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.book.as_ref())
    }

    fn insert(&mut self, book: Arc<Book>) -> BookHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.book = Some(book);
            return BookHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            book: Some(book),
        });
        BookHandle {
            index,
            generation: 0,
        }
    }

    fn remove(&mut self, handle: BookHandle) -> Option<Arc<Book>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let book = slot.book.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(book)
    }

    fn drain(&mut self) -> Vec<Arc<Book>> {
        let mut books = Vec::with_capacity(self.live);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(book) = slot.book.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                books.push(book);
            }
        }
        self.live = 0;
        books
    }
}

/// Connection owning a set of books fed by one order channel
pub struct FeedConnection {
    /// Configuration
    config: ConnectionConfig,
    /// Upstream order channel
    channel: Arc<dyn OrderChannel>,
    /// Live books
    registry: RwLock<BookRegistry>,
    /// Shutdown flag
    closed: AtomicBool,
}

impl FeedConnection {
    /// Create a connection over `channel`
    pub fn new(channel: Arc<dyn OrderChannel>, config: ConnectionConfig) -> Self {
        Self {
            config,
            channel,
            registry: RwLock::new(BookRegistry::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a connection with default configuration
    pub fn with_defaults(channel: Arc<dyn OrderChannel>) -> Self {
        Self::new(channel, ConnectionConfig::default())
    }

    /// Configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Check if the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of live books
    pub fn book_count(&self) -> usize {
        self.registry.read().live
    }

    /// Create a book for `(symbol, source)` showing `depth` levels per side
    ///
    /// `depth` 0 means unbounded. An empty `source` selects the composite
    /// book. Fails if the connection is closed, the symbol is invalid, the
    /// book limit is reached, or the channel refuses the subscription.
    pub fn create_book(
        &self,
        symbol: &str,
        source: &str,
        depth: u32,
    ) -> Result<BookHandle, FeedError> {
        self.create_book_with_listeners(symbol, source, depth, BookListeners::default())
    }

    /// Create a book with the connection's default depth
    pub fn create_book_default(&self, symbol: &str, source: &str) -> Result<BookHandle, FeedError> {
        self.create_book(symbol, source, self.config.default_depth)
    }

    /// Create a book from a [`BookConfig`]
    pub fn create_book_with(&self, config: &BookConfig) -> Result<BookHandle, FeedError> {
        let depth = config.depth.unwrap_or(self.config.default_depth);
        self.create_book(&config.symbol, &config.source, depth)
    }

    /// Create a book with listeners installed before the first batch
    #[instrument(skip(self, listeners))]
    pub fn create_book_with_listeners(
        &self,
        symbol: &str,
        source: &str,
        depth: u32,
        listeners: BookListeners,
    ) -> Result<BookHandle, FeedError> {
        if self.is_closed() {
            return Err(FeedError::ConnectionClosed);
        }

        let key = SubscriptionKey::new(Symbol::new(symbol)?, Source::new(source));
        if let Some(max_books) = self.config.max_books {
            if self.book_count() >= max_books {
                warn!(key = %key, max_books, "Book limit reached");
                return Err(FeedError::CapacityExceeded { max_books });
            }
        }

        let book = Book::open(key.clone(), depth, listeners, self.channel.clone()).map_err(|e| {
            warn!(key = %key, error = %e, "Subscription failed");
            e
        })?;

        let mut registry = self.registry.write();
        // Re-check under the write lock; close() or a racing create may have won
        if self.is_closed() {
            drop(registry);
            book.close();
            return Err(FeedError::ConnectionClosed);
        }
        if let Some(max_books) = self.config.max_books {
            if registry.live >= max_books {
                drop(registry);
                book.close();
                return Err(FeedError::CapacityExceeded { max_books });
            }
        }

        let handle = registry.insert(book);
        info!(key = %key, handle = %handle, "Book created");
        Ok(handle)
    }

    /// Look up a live book
    pub fn book(&self, handle: BookHandle) -> Result<Arc<Book>, FeedError> {
        self.registry
            .read()
            .get(handle)
            .cloned()
            .ok_or_else(|| handle.invalid())
    }

    /// Replace a book's listeners and user data
    pub fn set_listeners(
        &self,
        handle: BookHandle,
        listeners: BookListeners,
    ) -> Result<(), FeedError> {
        self.book(handle)?.set_listeners(listeners)
    }

    /// Close one book
    ///
    /// Returns true if this call closed it; false for a stale or
    /// already-closed handle.
    #[instrument(skip(self))]
    pub fn close_book(&self, handle: BookHandle) -> bool {
        let removed = self.registry.write().remove(handle);
        match removed {
            Some(book) => book.close(),
            None => {
                debug!(handle = %handle, "Close on stale handle");
                false
            }
        }
    }

    /// Close every book and reject further creates
    ///
    /// Returns the number of books closed by this call.
    #[instrument(skip(self))]
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        let books = self.registry.write().drain();
        let closed = books.iter().filter(|book| book.close()).count();
        info!(books = closed, "Connection closed");
        closed
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        for book in self.registry.get_mut().drain() {
            book.close();
        }
    }
}
