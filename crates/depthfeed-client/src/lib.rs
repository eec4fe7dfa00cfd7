//! Thread-safe order books driven by an order channel
//!
//! This crate binds the [`depthfeed_book`] engine to an upstream order
//! channel. A [`FeedConnection`] creates books, hands out generation-checked
//! [`BookHandle`]s, and closes books on request. Each [`Book`] guards its
//! engine and listeners with a single mutex and invokes listeners on the
//! channel's delivery thread with that lock held.
//!
//! # Example
//!
//! ```
//! use depthfeed_client::{BookListeners, ConnectionConfig, FeedConnection, LocalOrderChannel};
//! use depthfeed_types::{RawOrderEvent, Side, Source, SubscriptionKey, Symbol};
//!
//! let channel = LocalOrderChannel::shared();
//! let conn = FeedConnection::new(channel.clone(), ConnectionConfig::default());
//!
//! let handle = conn.create_book("IBM", "", 5).unwrap();
//! conn.set_listeners(
//!     handle,
//!     BookListeners::new().on_new_book(|window| {
//!         println!("{} bids: {:?}", window.symbol, window.bids);
//!     }),
//! )
//! .unwrap();
//!
//! let key = SubscriptionKey::new(Symbol::new("IBM").unwrap(), Source::composite());
//! channel.publish(&key, &[RawOrderEvent::new(1, Side::Buy, 10.0, 5.0, 0)], true);
//!
//! assert_eq!(conn.book(handle).unwrap().visible_bids()[0].size, 5.0);
//! assert!(conn.close_book(handle));
//! ```

pub mod book;
pub mod channel;
pub mod config;
pub mod connection;
pub mod listeners;

// Re-export main types
pub use book::Book;
pub use channel::{BatchListener, ListenerId, LocalOrderChannel, OrderChannel};
pub use config::{BookConfig, ConnectionConfig, DEFAULT_DEPTH};
pub use connection::{BookHandle, FeedConnection};
pub use listeners::{
    BookDiff, BookListeners, BookUpdateListener, BookWindow, IncrementalChangeListener,
    NewBookListener, UserData,
};
