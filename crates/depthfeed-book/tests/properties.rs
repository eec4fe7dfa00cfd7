//! Property-based tests for book invariants
//!
//! Uses proptest to verify that, for arbitrary batch sequences:
//!
//! - The visible window always holds `min(depth, stored)` levels per side
//! - Every stored level matches a naive re-aggregation of the live orders
//! - A mirror fed only emitted payloads equals the visible window
//! - Re-delivering an identical snapshot yields an identical new book
//! - Cancelling every live order empties both sides, whatever the sizes

use depthfeed_book::{BatchOutcome, BookMirror, DepthBook};
use depthfeed_types::{BookSide, PriceLevel, RawOrderEvent, Side, Source, SubscriptionKey, Symbol};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Generate an order size: whole lots (zero is a removal) or tenths, whose
/// sums do not cancel exactly in floating point
fn arb_size() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0u32..5).prop_map(f64::from),
        (1u32..10_000).prop_map(|n| f64::from(n) * 0.1),
    ]
}

/// Generate an order event on a small id/price grid so ids and levels collide
fn arb_event() -> impl Strategy<Value = RawOrderEvent> {
    (
        0i64..24,
        any::<bool>(),
        0u32..12,
        arb_size(),
        0i64..1_000,
        prop::bool::weighted(0.1),
    )
        .prop_map(|(id, buy, tick, size, time, removed)| {
            let side = if buy { Side::Buy } else { Side::Sell };
            let price = 100.0 + f64::from(tick) * 0.25;
            let mut event = RawOrderEvent::new(id, side, price, size, time);
            event.removed = removed;
            event
        })
}

/// Generate a batch and its snapshot flag (snapshots are occasional)
fn arb_batch() -> impl Strategy<Value = (Vec<RawOrderEvent>, bool)> {
    (prop::collection::vec(arb_event(), 0..16), prop::bool::weighted(0.1))
}

fn arb_depth() -> impl Strategy<Value = u32> {
    0u32..5
}

fn new_book(depth: u32) -> DepthBook {
    let key = SubscriptionKey::new(Symbol::new("PROP").unwrap(), Source::composite());
    DepthBook::new(key, depth)
}

/// Naive reference: live orders re-aggregated from scratch
#[derive(Default)]
struct Model {
    orders: HashMap<i64, RawOrderEvent>,
}

impl Model {
    fn apply(&mut self, events: &[RawOrderEvent], snapshot: bool) {
        if snapshot {
            self.orders.clear();
        }
        for event in events {
            if event.is_removal() {
                self.orders.remove(&event.order_id);
            } else {
                self.orders.insert(event.order_id, *event);
            }
        }
    }

    /// (price, size) per side, best first
    fn levels(&self, side: BookSide) -> Vec<(f64, f64)> {
        let mut sizes: BTreeMap<u64, (f64, f64)> = BTreeMap::new();
        for order in self.orders.values() {
            if order.side.book_side() == side {
                let entry = sizes.entry(order.price.to_bits()).or_insert((order.price, 0.0));
                entry.1 += order.size;
            }
        }
        let mut levels: Vec<(f64, f64)> = sizes.into_values().collect();
        levels.sort_by(|a, b| side.rank(a.0, b.0));
        levels
    }
}

fn price_size(levels: &[PriceLevel]) -> Vec<(f64, f64)> {
    levels.iter().map(|l| (l.price, l.size)).collect()
}

/// Same prices, sizes equal up to summation-order rounding
fn levels_close(actual: &[(f64, f64)], expected: &[(f64, f64)]) -> bool {
    actual.len() == expected.len()
        && actual.iter().zip(expected).all(|(a, e)| {
            a.0 == e.0 && (a.1 - e.1).abs() <= 1e-9 * e.1.abs().max(1.0)
        })
}

fn expected_window(depth: u32, stored: usize) -> usize {
    if depth == 0 {
        stored
    } else {
        stored.min(depth as usize)
    }
}

proptest! {
    #[test]
    fn prop_window_size_invariant(
        depth in arb_depth(),
        batches in prop::collection::vec(arb_batch(), 1..20),
    ) {
        let mut book = new_book(depth);
        for (events, snapshot) in &batches {
            book.process_batch(events, *snapshot).unwrap();
            for side in [BookSide::Ask, BookSide::Bid] {
                let stored = book.stored_level_count(side);
                let visible = book.side(side).visible_count();
                prop_assert_eq!(visible, expected_window(depth, stored));
                prop_assert_eq!(book.side(side).visible_vec().len(), visible);
            }
        }
    }

    #[test]
    fn prop_levels_match_reference(
        depth in arb_depth(),
        batches in prop::collection::vec(arb_batch(), 1..20),
    ) {
        let mut book = new_book(depth);
        let mut model = Model::default();
        for (events, snapshot) in &batches {
            book.process_batch(events, *snapshot).unwrap();
            model.apply(events, *snapshot);

            for side in [BookSide::Ask, BookSide::Bid] {
                let stored: Vec<PriceLevel> = book.side(side).levels().copied().collect();
                let (actual, expected) = (price_size(&stored), model.levels(side));
                prop_assert!(levels_close(&actual, &expected), "{:?} != {:?}", actual, expected);
            }
            prop_assert_eq!(book.order_count(), model.orders.len());
            prop_assert_eq!(book.anomalies(), 0);
        }
    }

    #[test]
    fn prop_diff_replay_matches_window(
        depth in arb_depth(),
        batches in prop::collection::vec(arb_batch(), 1..20),
    ) {
        let mut book = new_book(depth);
        let mut mirror = BookMirror::new();
        for (events, snapshot) in &batches {
            match book.process_batch(events, *snapshot).unwrap() {
                BatchOutcome::NewBook => mirror.reset(&book.visible_asks(), &book.visible_bids()),
                BatchOutcome::Changed(changes) => mirror.apply(&changes),
                BatchOutcome::Unchanged => {}
            }
            prop_assert_eq!(mirror.asks(), book.visible_asks());
            prop_assert_eq!(mirror.bids(), book.visible_bids());
        }
        prop_assert_eq!(mirror.mismatches(), 0);
    }

    #[test]
    fn prop_identical_snapshot_is_idempotent(
        depth in arb_depth(),
        prefix in prop::collection::vec(arb_batch(), 0..6),
        snapshot in prop::collection::vec(arb_event(), 0..24),
    ) {
        let mut book = new_book(depth);
        for (events, is_snapshot) in &prefix {
            book.process_batch(events, *is_snapshot).unwrap();
        }

        prop_assert_eq!(book.process_batch(&snapshot, true).unwrap(), BatchOutcome::NewBook);
        let first = (book.visible_asks(), book.visible_bids());
        prop_assert_eq!(book.process_batch(&snapshot, true).unwrap(), BatchOutcome::NewBook);
        let second = (book.visible_asks(), book.visible_bids());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_full_cancel_converges_to_empty(
        depth in arb_depth(),
        adds in prop::collection::vec(arb_event(), 0..32),
        seed in any::<u64>(),
    ) {
        let mut book = new_book(depth);
        book.process_batch(&adds, false).unwrap();

        // Cancel every live order in a seed-dependent order
        let mut live: Vec<i64> = adds.iter().map(|e| e.order_id).collect();
        live.sort_unstable();
        live.dedup();
        live.sort_by_key(|id| (*id as u64).wrapping_mul(seed | 1).rotate_left(17));

        for id in live {
            book.process_batch(&[RawOrderEvent::removal(id, Side::Buy, 0.0, 0)], false).unwrap();
        }

        prop_assert!(book.visible_asks().is_empty());
        prop_assert!(book.visible_bids().is_empty());
        prop_assert_eq!(book.stored_level_count(BookSide::Ask), 0);
        prop_assert_eq!(book.stored_level_count(BookSide::Bid), 0);
        prop_assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn prop_fractional_level_cancels_to_nothing(
        sizes in prop::collection::vec((1u32..10_000).prop_map(|n| f64::from(n) * 0.1), 1..8),
        seed in any::<u64>(),
    ) {
        let mut book = new_book(1);
        let mut adds: Vec<RawOrderEvent> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| RawOrderEvent::new(i as i64, Side::Sell, 10.0, *size, 0))
            .collect();
        adds.push(RawOrderEvent::new(99, Side::Sell, 10.5, 1.0, 0));
        book.process_batch(&adds, true).unwrap();

        let mut ids: Vec<i64> = (0..sizes.len() as i64).collect();
        ids.sort_by_key(|id| (*id as u64).wrapping_mul(seed | 1).rotate_left(17));
        for id in ids {
            book.process_batch(&[RawOrderEvent::removal(id, Side::Sell, 10.0, 0)], false).unwrap();
        }

        prop_assert_eq!(book.visible_asks(), vec![PriceLevel::new(10.5, 1.0, 0)]);
        prop_assert_eq!(book.stored_level_count(BookSide::Ask), 1);
        prop_assert_eq!(book.order_count(), 1);
    }
}
