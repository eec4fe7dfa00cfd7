//! Book state machine
//!
//! Owns the order table and both side stores for one (symbol, source) pair,
//! and turns raw order batches into window notifications.
//!
//! # State Machine
//!
//! ```text
//! Uninitialized → Active → Closed
//! ```
//!
//! Any accepted batch activates the book. A snapshot batch clears all state
//! first. `Closed` is terminal: every later batch is rejected.

use crate::{
    changes::BookChanges,
    checksum::window_checksum,
    orders::OrderTable,
    storage::SideStore,
};
use depthfeed_types::{BookSide, FeedError, PriceLevel, RawOrderEvent, SubscriptionKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Book lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookState {
    /// No batch received yet
    #[default]
    Uninitialized,
    /// Processing batches
    Active,
    /// Torn down; rejects further batches
    Closed,
}

/// What a batch did to the visible window
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Snapshot replaced the whole book (report the full window)
    NewBook,
    /// Incremental batch changed the window
    Changed(BookChanges),
    /// Incremental batch left the window untouched
    Unchanged,
}

/// Two-sided order-aggregated book with a bounded visible window
#[derive(Debug, Clone)]
pub struct DepthBook {
    /// Subscription this book maintains
    key: SubscriptionKey,
    /// Visible depth per side (0 = unbounded)
    depth: u32,
    /// Last contribution of every live order
    orders: OrderTable,
    /// Ask levels
    asks: SideStore,
    /// Bid levels
    bids: SideStore,
    /// Lifecycle state
    state: BookState,
}

impl DepthBook {
    /// Create an empty book
    pub fn new(key: SubscriptionKey, depth: u32) -> Self {
        Self {
            key,
            depth,
            orders: OrderTable::new(),
            asks: SideStore::new(BookSide::Ask, depth),
            bids: SideStore::new(BookSide::Bid, depth),
            state: BookState::Uninitialized,
        }
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
        self.state
    }

    /// Check if the book has been closed
    pub fn is_closed(&self) -> bool {
        self.state == BookState::Closed
    }

    /// Number of live orders
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Number of stored levels (visible and hidden) on a side
    pub fn stored_level_count(&self, side: BookSide) -> usize {
        self.side(side).len()
    }

    /// Side store for a side
    pub fn side(&self, side: BookSide) -> &SideStore {
        match side {
            BookSide::Ask => &self.asks,
            BookSide::Bid => &self.bids,
        }
    }

    /// Visible asks, best first
    pub fn visible_asks(&self) -> Vec<PriceLevel> {
        self.asks.visible_vec()
    }

    /// Visible bids, best first
    pub fn visible_bids(&self) -> Vec<PriceLevel> {
        self.bids.visible_vec()
    }

    /// Best bid
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.best()
    }

    /// Best ask
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.best()
    }

    /// Spread (ask - bid)
    pub fn spread(&self) -> Option<f64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Mid price ((ask + bid) / 2)
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some((ask.price + bid.price) / 2.0),
            _ => None,
        }
    }

    /// Checksum of the visible window
    pub fn checksum(&self) -> u32 {
        window_checksum(&self.visible_asks(), &self.visible_bids())
    }

    /// Deltas absorbed as defensive no-ops across both sides
    pub fn anomalies(&self) -> u64 {
        self.asks.anomalies() + self.bids.anomalies()
    }

    /// Apply one batch of raw order events
    ///
    /// A snapshot batch clears the order table and both sides before the
    /// events are applied, and always yields [`BatchOutcome::NewBook`], even
    /// when the resulting book is empty.
    pub fn process_batch(
        &mut self,
        events: &[RawOrderEvent],
        is_new_snapshot: bool,
    ) -> Result<BatchOutcome, FeedError> {
        if self.is_closed() {
            return Err(FeedError::BookClosed {
                key: self.key.to_string(),
            });
        }

        if is_new_snapshot {
            self.clear();
        }
        self.state = BookState::Active;

        let deltas = self.orders.aggregate(events);
        let ask_changes = self.asks.apply(&deltas.asks);
        let bid_changes = self.bids.apply(&deltas.bids);

        if is_new_snapshot {
            debug!(
                key = %self.key,
                events = events.len(),
                asks = self.asks.visible_count(),
                bids = self.bids.visible_count(),
                "Snapshot applied"
            );
            return Ok(BatchOutcome::NewBook);
        }

        let changes = BookChanges::from_sides(ask_changes, bid_changes);
        if changes.is_empty() {
            Ok(BatchOutcome::Unchanged)
        } else {
            Ok(BatchOutcome::Changed(changes))
        }
    }

    /// Tear the book down; further batches are rejected
    pub fn close(&mut self) {
        self.clear();
        self.state = BookState::Closed;
    }

    fn clear(&mut self) {
        self.orders.clear();
        self.asks.clear();
        self.bids.clear();
    }

    /// Capture the visible window as a snapshot
    pub fn snapshot(&self) -> BookSnapshot {
        let asks = self.visible_asks();
        let bids = self.visible_bids();
        BookSnapshot {
            symbol: self.symbol().to_string(),
            source: self.source().to_string(),
            checksum: window_checksum(&asks, &bids),
            asks,
            bids,
            state: self.state,
        }
    }
}

/// Immutable snapshot of the visible window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Instrument symbol
    pub symbol: String,
    /// Liquidity source
    pub source: String,
    /// Visible ask levels, best first
    pub asks: Vec<PriceLevel>,
    /// Visible bid levels, best first
    pub bids: Vec<PriceLevel>,
    /// Window checksum at time of snapshot
    pub checksum: u32,
    /// State at time of snapshot
    #[serde(skip)]
    pub state: BookState,
}

impl BookSnapshot {
    /// Best bid price
    pub fn best_bid_price(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    /// Best ask price
    pub fn best_ask_price(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    /// Spread
    pub fn spread(&self) -> Option<f64> {
        match (self.best_ask_price(), self.best_bid_price()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Mid price
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_ask_price(), self.best_bid_price()) {
            (Some(ask), Some(bid)) => Some((ask + bid) / 2.0),
            _ => None,
        }
    }
}
