//! Common test utilities for client integration tests

#![allow(dead_code)]

use depthfeed_book::BookChanges;
use depthfeed_client::BookListeners;
use depthfeed_types::{PriceLevel, RawOrderEvent, Side, Source, SubscriptionKey, Symbol};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded listener invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    NewBook {
        symbol: String,
        asks: Vec<PriceLevel>,
        bids: Vec<PriceLevel>,
    },
    BookUpdate {
        symbol: String,
        asks: Vec<PriceLevel>,
        bids: Vec<PriceLevel>,
    },
    IncrementalChange(BookChanges),
}

/// Listener set that records every invocation in order
#[derive(Default, Clone)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listeners(&self) -> BookListeners {
        let (new_book, update, change) = (self.log.clone(), self.log.clone(), self.log.clone());
        BookListeners::new()
            .on_new_book(move |window| {
                new_book.lock().push(Notification::NewBook {
                    symbol: window.symbol.to_string(),
                    asks: window.asks.to_vec(),
                    bids: window.bids.to_vec(),
                });
            })
            .on_book_update(move |window| {
                update.lock().push(Notification::BookUpdate {
                    symbol: window.symbol.to_string(),
                    asks: window.asks.to_vec(),
                    bids: window.bids.to_vec(),
                });
            })
            .on_incremental_change(move |diff| {
                change
                    .lock()
                    .push(Notification::IncrementalChange(diff.changes.clone()));
            })
    }

    /// Take everything recorded so far
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.log.lock())
    }
}

pub fn key(symbol: &str, source: &str) -> SubscriptionKey {
    SubscriptionKey::new(Symbol::new(symbol).unwrap(), Source::new(source))
}

pub fn buy(id: i64, price: f64, size: f64) -> RawOrderEvent {
    RawOrderEvent::new(id, Side::Buy, price, size, 0)
}

pub fn sell(id: i64, price: f64, size: f64) -> RawOrderEvent {
    RawOrderEvent::new(id, Side::Sell, price, size, 0)
}

pub fn level(price: f64, size: f64) -> PriceLevel {
    PriceLevel::new(price, size, 0)
}
