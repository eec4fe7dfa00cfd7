//! Order aggregation and bounded-depth book engine
//!
//! This crate turns batches of raw order events into a two-sided book of
//! price levels, keeps the best `depth` levels per side visible, and emits
//! the minimal diff a remote consumer needs to mirror that window.
//!
//! It owns no threads and no locks; the client crate wraps a [`DepthBook`]
//! in a mutex and drives it from the order channel's delivery thread.
//!
//! # Example
//!
//! ```
//! use depthfeed_book::{BatchOutcome, BookState, DepthBook};
//! use depthfeed_types::{RawOrderEvent, Side, Source, SubscriptionKey, Symbol};
//!
//! let key = SubscriptionKey::new(Symbol::new("IBM").unwrap(), Source::composite());
//! let mut book = DepthBook::new(key, 10);
//! assert_eq!(book.state(), BookState::Uninitialized);
//!
//! let outcome = book
//!     .process_batch(&[RawOrderEvent::new(1, Side::Buy, 10.0, 5.0, 0)], true)
//!     .unwrap();
//! assert_eq!(outcome, BatchOutcome::NewBook);
//! assert_eq!(book.visible_bids()[0].size, 5.0);
//! ```

pub mod changes;
pub mod checksum;
pub mod mirror;
pub mod orderbook;
pub mod orders;
pub mod storage;

// Re-export main types
pub use changes::{BookChanges, ChangeSet, SideLevels};
pub use checksum::{
    window_checksum, window_checksum_with_precision, DEFAULT_PRICE_PRECISION,
    DEFAULT_SIZE_PRECISION,
};
pub use mirror::BookMirror;
pub use orderbook::{BatchOutcome, BookSnapshot, BookState, DepthBook};
pub use orders::{DeltaBatch, OrderTable};
pub use storage::SideStore;
