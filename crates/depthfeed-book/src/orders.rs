//! Order state table and order-to-level delta aggregation
//!
//! The table remembers the last live contribution of every order so that
//! updates and removals can be turned into signed per-level deltas. Deltas
//! for the same (side, price) within one batch are merged, and merged deltas
//! that cancel out are dropped before they reach the side stores.
//!
//! It also counts the live orders behind each level. When the last one
//! leaves, the level's delta is marked emptied, so the side store drops the
//! level outright rather than trusting a float sum to come back to zero.

use crate::storage::PriceKey;
use depthfeed_types::{approx_eq, BookSide, LevelDelta, OrderContribution, RawOrderEvent};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Merged per-level deltas for one batch, best price first per side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaBatch {
    /// Ask-side deltas
    pub asks: Vec<LevelDelta>,
    /// Bid-side deltas
    pub bids: Vec<LevelDelta>,
}

impl DeltaBatch {
    /// Check if the batch changes nothing
    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }
}

/// Order id -> last live contribution
#[derive(Debug, Clone, Default)]
pub struct OrderTable {
    orders: HashMap<i64, OrderContribution>,
    /// Live orders per level
    ask_orders: BTreeMap<PriceKey, usize>,
    bid_orders: BTreeMap<PriceKey, usize>,
}

impl OrderTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an order's contribution
    pub fn get(&self, order_id: i64) -> Option<&OrderContribution> {
        self.orders.get(&order_id)
    }

    /// Check if an order is live
    pub fn contains(&self, order_id: i64) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Number of live orders
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Check if no orders are live
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of live orders resting at a price
    pub fn orders_at(&self, side: BookSide, price: f64) -> usize {
        self.level_orders(side)
            .get(&PriceKey::new(side, price))
            .copied()
            .unwrap_or(0)
    }

    /// Forget every order
    pub fn clear(&mut self) {
        self.orders.clear();
        self.ask_orders.clear();
        self.bid_orders.clear();
    }

    /// Fold a batch of raw events into the table and return the net deltas
    pub fn aggregate(&mut self, events: &[RawOrderEvent]) -> DeltaBatch {
        let mut merger = DeltaMerger::default();

        for event in events {
            let removal = event.is_removal();
            if !removal && !event.price.is_finite() {
                debug!(order_id = event.order_id, price = event.price, "non-finite price; event skipped");
                continue;
            }

            match self.orders.get(&event.order_id).copied() {
                None if removal => {
                    trace!(order_id = event.order_id, "removal of unknown order ignored");
                }
                None => {
                    let contribution = OrderContribution::from(event);
                    self.enter(&mut merger, &contribution, event.time);
                    self.orders.insert(event.order_id, contribution);
                }
                Some(old) if removal => {
                    self.leave(&mut merger, &old, event.time);
                    self.orders.remove(&event.order_id);
                }
                Some(old) if is_unchanged(&old, event) => {}
                Some(old) => {
                    let contribution = OrderContribution::from(event);
                    self.leave(&mut merger, &old, event.time);
                    self.enter(&mut merger, &contribution, event.time);
                    self.orders.insert(event.order_id, contribution);
                }
            }
        }

        merger.finish()
    }

    fn level_orders(&self, side: BookSide) -> &BTreeMap<PriceKey, usize> {
        match side {
            BookSide::Ask => &self.ask_orders,
            BookSide::Bid => &self.bid_orders,
        }
    }

    fn level_orders_mut(&mut self, side: BookSide) -> &mut BTreeMap<PriceKey, usize> {
        match side {
            BookSide::Ask => &mut self.ask_orders,
            BookSide::Bid => &mut self.bid_orders,
        }
    }

    /// An order starts contributing to its level
    fn enter(&mut self, merger: &mut DeltaMerger, order: &OrderContribution, time: i64) {
        let side = order.side.book_side();
        *self
            .level_orders_mut(side)
            .entry(PriceKey::new(side, order.price))
            .or_insert(0) += 1;
        merger.push(side, order.price, order.size, time);
    }

    /// An order stops contributing to its level
    fn leave(&mut self, merger: &mut DeltaMerger, order: &OrderContribution, time: i64) {
        let side = order.side.book_side();
        let key = PriceKey::new(side, order.price);
        let counts = self.level_orders_mut(side);
        let remaining = counts.get(&key).copied().unwrap_or(0).saturating_sub(1);

        if remaining == 0 {
            counts.remove(&key);
            merger.empty(side, order.price, time);
        } else {
            counts.insert(key, remaining);
            merger.push(side, order.price, -order.size, time);
        }
    }
}

fn is_unchanged(old: &OrderContribution, event: &RawOrderEvent) -> bool {
    old.side == event.side && approx_eq(old.price, event.price) && approx_eq(old.size, event.size)
}

/// Sums deltas per (side, price)
#[derive(Debug, Default)]
struct DeltaMerger {
    asks: BTreeMap<PriceKey, LevelDelta>,
    bids: BTreeMap<PriceKey, LevelDelta>,
}

impl DeltaMerger {
    fn levels(&mut self, side: BookSide) -> &mut BTreeMap<PriceKey, LevelDelta> {
        match side {
            BookSide::Ask => &mut self.asks,
            BookSide::Bid => &mut self.bids,
        }
    }

    fn push(&mut self, side: BookSide, price: f64, size_change: f64, time: i64) {
        self.levels(side)
            .entry(PriceKey::new(side, price))
            .and_modify(|delta| {
                delta.size_change += size_change;
                delta.time = delta.time.max(time);
            })
            .or_insert_with(|| LevelDelta::new(side, price, size_change, time));
    }

    /// Everything contributed so far is gone; later pushes start from zero
    fn empty(&mut self, side: BookSide, price: f64, time: i64) {
        self.levels(side)
            .entry(PriceKey::new(side, price))
            .and_modify(|delta| {
                delta.size_change = 0.0;
                delta.emptied = true;
                delta.time = delta.time.max(time);
            })
            .or_insert_with(|| LevelDelta::emptied(side, price, time));
    }

    fn finish(self) -> DeltaBatch {
        DeltaBatch {
            asks: self.asks.into_values().filter(|d| !d.is_zero()).collect(),
            bids: self.bids.into_values().filter(|d| !d.is_zero()).collect(),
        }
    }
}
