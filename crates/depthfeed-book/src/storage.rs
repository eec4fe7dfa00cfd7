//! Bounded-depth side storage
//!
//! Each side of the book is a `BTreeMap` of price levels ranked best to
//! worst, plus a boundary key marking the worst *visible* level. Only the
//! best `depth` levels are exposed; the rest are kept so that a level can
//! slide back into the window when a better one disappears.
//!
//! The boundary is a [`PriceKey`]. When fewer than `depth` levels are
//! stored (or `depth == 0`), it holds the NaN "past the end" sentinel, which
//! ranks below every real price, so the whole store is visible.

use crate::changes::{ChangeSet, WindowJournal};
use depthfeed_types::{is_zero_size, BookSide, LevelDelta, PriceLevel};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use tracing::warn;

/// Map key ranking prices best to worst for one side
#[derive(Debug, Clone, Copy)]
pub(crate) struct PriceKey {
    side: BookSide,
    price: f64,
}

impl PriceKey {
    pub(crate) fn new(side: BookSide, price: f64) -> Self {
        // Fold -0.0 into 0.0 so both land on one level
        Self {
            side,
            price: price + 0.0,
        }
    }

    /// Sentinel ranking after every stored level
    pub(crate) fn past_end(side: BookSide) -> Self {
        Self {
            side,
            price: f64::NAN,
        }
    }

    pub(crate) fn is_past_end(&self) -> bool {
        self.price.is_nan()
    }
}

impl PartialEq for PriceKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriceKey {}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.side.rank(self.price, other.price)
    }
}

/// One side of the book with a bounded visible window
#[derive(Debug, Clone)]
pub struct SideStore {
    /// Which side this store ranks for
    side: BookSide,
    /// Visible window size (0 = unbounded)
    depth: usize,
    /// All non-zero levels, best first
    levels: BTreeMap<PriceKey, PriceLevel>,
    /// Worst visible level, or the past-the-end sentinel
    boundary: PriceKey,
    /// Deltas absorbed because they contradicted stored state
    anomalies: u64,
}

impl SideStore {
    /// Create an empty store
    pub fn new(side: BookSide, depth: u32) -> Self {
        Self {
            side,
            depth: depth as usize,
            levels: BTreeMap::new(),
            boundary: PriceKey::past_end(side),
            anomalies: 0,
        }
    }

    /// Side of this store
    pub fn side(&self) -> BookSide {
        self.side
    }

    /// Configured depth (0 = unbounded)
    pub fn depth(&self) -> u32 {
        self.depth as u32
    }

    /// Number of stored (visible and hidden) levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if no levels are stored
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of levels in the visible window
    pub fn visible_count(&self) -> usize {
        if self.depth == 0 {
            self.levels.len()
        } else {
            self.levels.len().min(self.depth)
        }
    }

    /// Iterator over the visible window, best first
    pub fn visible(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.values().take(self.visible_count())
    }

    /// Visible window as a vector
    pub fn visible_vec(&self) -> Vec<PriceLevel> {
        self.visible().copied().collect()
    }

    /// Iterator over every stored level, best first
    pub fn levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.values()
    }

    /// Best level
    pub fn best(&self) -> Option<&PriceLevel> {
        self.levels.values().next()
    }

    /// Worst visible level when the depth limit is binding
    pub fn boundary(&self) -> Option<&PriceLevel> {
        if self.boundary.is_past_end() {
            None
        } else {
            self.levels.get(&self.boundary)
        }
    }

    /// Look up a stored level by price
    pub fn get(&self, price: f64) -> Option<&PriceLevel> {
        self.levels.get(&PriceKey::new(self.side, price))
    }

    /// Number of deltas absorbed as defensive no-ops
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    /// Remove every level
    pub fn clear(&mut self) {
        self.levels.clear();
        self.boundary = PriceKey::past_end(self.side);
    }

    /// Apply merged level deltas and return the visible-window change-set
    pub fn apply(&mut self, deltas: &[LevelDelta]) -> ChangeSet {
        let mut journal = WindowJournal::default();

        for delta in deltas {
            if delta.side != self.side || !delta.price.is_finite() {
                self.anomaly("delta does not belong to this side", delta);
                continue;
            }

            let key = PriceKey::new(self.side, delta.price);
            let existing = self.levels.get(&key).copied();
            let size = delta.resulting_size(existing.map_or(0.0, |level| level.size));

            match existing {
                Some(old) if is_zero_size(size) => self.remove_level(key, old, &mut journal),
                Some(old) if size < 0.0 => {
                    self.anomaly("level size went negative", delta);
                    self.remove_level(key, old, &mut journal);
                }
                Some(old) => {
                    let new = PriceLevel::new(old.price, size, delta.time);
                    self.update_level(key, old, new, &mut journal);
                }
                None if is_zero_size(size) => {}
                None if size < 0.0 => self.anomaly("removal for a level not in storage", delta),
                None => {
                    let level = PriceLevel::new(key.price, size, delta.time);
                    self.add_level(key, level, &mut journal);
                }
            }
        }

        journal.into_change_set()
    }

    fn remove_level(&mut self, key: PriceKey, old: PriceLevel, journal: &mut WindowJournal) {
        self.levels.remove(&key);
        if key > self.boundary {
            return;
        }

        journal.removed(key, old);
        if self.depth == 0 || self.boundary.is_past_end() {
            return;
        }

        // The first hidden level slides into the window
        self.boundary = match self.levels.range((Excluded(self.boundary), Unbounded)).next() {
            Some((next_key, next)) => {
                journal.added(*next_key, *next);
                *next_key
            }
            None => PriceKey::past_end(self.side),
        };
    }

    fn add_level(&mut self, key: PriceKey, level: PriceLevel, journal: &mut WindowJournal) {
        self.levels.insert(key, level);
        if key > self.boundary {
            return;
        }

        journal.added(key, level);
        if self.depth == 0 {
            return;
        }

        if self.boundary.is_past_end() {
            if self.levels.len() >= self.depth {
                if let Some((last, _)) = self.levels.iter().next_back() {
                    self.boundary = *last;
                }
            }
            return;
        }

        // The old boundary is pushed out of the window
        if let Some(pushed) = self.levels.get(&self.boundary).copied() {
            journal.removed(self.boundary, pushed);
        }
        if let Some((prev, _)) = self.levels.range(..self.boundary).next_back() {
            self.boundary = *prev;
        }
    }

    fn update_level(
        &mut self,
        key: PriceKey,
        old: PriceLevel,
        new: PriceLevel,
        journal: &mut WindowJournal,
    ) {
        self.levels.insert(key, new);
        if key <= self.boundary {
            journal.updated(key, old, new);
        }
    }

    fn anomaly(&mut self, what: &str, delta: &LevelDelta) {
        self.anomalies += 1;
        warn!(
            side = self.side.as_str(),
            price = delta.price,
            size_change = delta.size_change,
            "{what}; delta ignored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(price: f64, change: f64) -> LevelDelta {
        LevelDelta::new(BookSide::Bid, price, change, 0)
    }

    fn ask(price: f64, change: f64) -> LevelDelta {
        LevelDelta::new(BookSide::Ask, price, change, 0)
    }

    fn prices(levels: &[PriceLevel]) -> Vec<f64> {
        levels.iter().map(|l| l.price).collect()
    }

    #[test]
    fn test_bid_order() {
        let mut store = SideStore::new(BookSide::Bid, 0);
        store.apply(&[bid(100.0, 1.0), bid(101.0, 2.0), bid(99.0, 3.0)]);

        assert_eq!(prices(&store.visible_vec()), vec![101.0, 100.0, 99.0]);
    }

    #[test]
    fn test_ask_order() {
        let mut store = SideStore::new(BookSide::Ask, 0);
        store.apply(&[ask(100.0, 1.0), ask(101.0, 2.0), ask(99.0, 3.0)]);

        assert_eq!(prices(&store.visible_vec()), vec![99.0, 100.0, 101.0]);
    }

    #[test]
    fn test_unbounded_emits_verbatim() {
        let mut store = SideStore::new(BookSide::Ask, 0);
        let changes = store.apply(&[ask(100.0, 1.0), ask(101.0, 2.0)]);
        assert_eq!(prices(&changes.additions), vec![100.0, 101.0]);

        let changes = store.apply(&[ask(100.0, -1.0), ask(101.0, 1.0)]);
        assert_eq!(prices(&changes.removals), vec![100.0]);
        assert_eq!(changes.updates, vec![PriceLevel::new(101.0, 3.0, 0)]);
        assert!(store.boundary().is_none());
    }

    #[test]
    fn test_zero_result_removes_level() {
        let mut store = SideStore::new(BookSide::Bid, 5);
        store.apply(&[bid(100.0, 1.0)]);
        assert_eq!(store.len(), 1);

        let changes = store.apply(&[bid(100.0, -1.0)]);
        assert_eq!(store.len(), 0);
        assert_eq!(changes.removals, vec![PriceLevel::new(100.0, 1.0, 0)]);
    }

    #[test]
    fn test_emptied_level_removed_despite_residue() {
        let mut store = SideStore::new(BookSide::Ask, 2);
        store.apply(&[ask(10.0, 1.0), ask(10.5, 2.0), ask(11.0, 3.0)]);
        // A running sum left behind by fractional sizes
        store.apply(&[ask(10.0, f64::EPSILON - 1.0)]);
        assert_eq!(store.get(10.0).map(|l| l.size), Some(f64::EPSILON));

        let changes = store.apply(&[LevelDelta::emptied(BookSide::Ask, 10.0, 1)]);
        assert_eq!(prices(&changes.removals), vec![10.0]);
        assert_eq!(prices(&changes.additions), vec![11.0]);
        assert!(store.get(10.0).is_none());
        assert_eq!(prices(&store.visible_vec()), vec![10.5, 11.0]);
    }

    #[test]
    fn test_emptied_then_refilled_level_takes_new_size() {
        let mut store = SideStore::new(BookSide::Bid, 3);
        store.apply(&[bid(10.0, 0.30000000000000004)]);

        let mut refill = LevelDelta::emptied(BookSide::Bid, 10.0, 2);
        refill.size_change = 0.3;
        let changes = store.apply(&[refill]);
        assert_eq!(changes.updates, vec![PriceLevel::new(10.0, 0.3, 2)]);
    }

    #[test]
    fn test_addition_pushes_boundary_out() {
        let mut store = SideStore::new(BookSide::Bid, 1);
        store.apply(&[bid(9.9, 1.0), bid(9.8, 1.0)]);
        assert_eq!(prices(&store.visible_vec()), vec![9.9]);

        let changes = store.apply(&[bid(9.95, 2.0)]);
        assert_eq!(changes.additions, vec![PriceLevel::new(9.95, 2.0, 0)]);
        assert_eq!(changes.removals, vec![PriceLevel::new(9.9, 1.0, 0)]);
        assert!(changes.updates.is_empty());
        assert_eq!(prices(&store.visible_vec()), vec![9.95]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_hidden_addition_is_silent() {
        let mut store = SideStore::new(BookSide::Ask, 2);
        store.apply(&[ask(100.0, 1.0), ask(101.0, 1.0)]);

        let changes = store.apply(&[ask(105.0, 1.0)]);
        assert!(changes.is_empty());
        assert_eq!(store.len(), 3);
        assert_eq!(store.boundary().map(|l| l.price), Some(101.0));
    }

    #[test]
    fn test_visible_removal_reveals_next_hidden() {
        let mut store = SideStore::new(BookSide::Ask, 2);
        store.apply(&[ask(100.0, 1.0), ask(101.0, 2.0), ask(102.0, 3.0)]);

        let changes = store.apply(&[ask(100.0, -1.0)]);
        assert_eq!(changes.removals, vec![PriceLevel::new(100.0, 1.0, 0)]);
        assert_eq!(changes.additions, vec![PriceLevel::new(102.0, 3.0, 0)]);
        assert_eq!(prices(&store.visible_vec()), vec![101.0, 102.0]);
        assert_eq!(store.boundary().map(|l| l.price), Some(102.0));
    }

    #[test]
    fn test_boundary_removal_without_hidden_levels() {
        let mut store = SideStore::new(BookSide::Ask, 2);
        store.apply(&[ask(100.0, 1.0), ask(101.0, 2.0)]);

        let changes = store.apply(&[ask(101.0, -2.0)]);
        assert_eq!(prices(&changes.removals), vec![101.0]);
        assert!(changes.additions.is_empty());
        assert!(store.boundary().is_none());
        assert_eq!(store.visible_count(), 1);
    }

    #[test]
    fn test_hidden_update_is_silent() {
        let mut store = SideStore::new(BookSide::Bid, 1);
        store.apply(&[bid(10.0, 1.0), bid(9.0, 1.0)]);

        let changes = store.apply(&[bid(9.0, 4.0)]);
        assert!(changes.is_empty());
        assert_eq!(store.get(9.0).map(|l| l.size), Some(5.0));

        let changes = store.apply(&[bid(10.0, 1.0)]);
        assert_eq!(changes.updates, vec![PriceLevel::new(10.0, 2.0, 0)]);
    }

    #[test]
    fn test_hidden_removal_is_silent() {
        let mut store = SideStore::new(BookSide::Bid, 1);
        store.apply(&[bid(10.0, 1.0), bid(9.0, 1.0)]);

        let changes = store.apply(&[bid(9.0, -1.0)]);
        assert!(changes.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_push_out_and_back_in_one_batch_cancels() {
        let mut store = SideStore::new(BookSide::Bid, 1);
        store.apply(&[bid(9.9, 1.0)]);

        // 10.0 pushes 9.9 out, then 10.5 pushes 10.0 out
        let changes = store.apply(&[bid(10.0, 1.0), bid(10.5, 1.0)]);
        assert_eq!(prices(&changes.additions), vec![10.5]);
        assert_eq!(prices(&changes.removals), vec![9.9]);
        assert_eq!(prices(&store.visible_vec()), vec![10.5]);
    }

    #[test]
    fn test_removal_of_missing_level_is_absorbed() {
        let mut store = SideStore::new(BookSide::Ask, 3);
        store.apply(&[ask(100.0, 1.0)]);

        let changes = store.apply(&[ask(200.0, -5.0)]);
        assert!(changes.is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(store.anomalies(), 1);
    }

    #[test]
    fn test_overdrawn_level_is_removed() {
        let mut store = SideStore::new(BookSide::Ask, 3);
        store.apply(&[ask(100.0, 1.0)]);

        let changes = store.apply(&[ask(100.0, -3.0)]);
        assert_eq!(prices(&changes.removals), vec![100.0]);
        assert!(store.is_empty());
        assert_eq!(store.anomalies(), 1);
    }

    #[test]
    fn test_wrong_side_delta_is_absorbed() {
        let mut store = SideStore::new(BookSide::Ask, 3);
        let changes = store.apply(&[bid(100.0, 1.0)]);
        assert!(changes.is_empty());
        assert!(store.is_empty());
        assert_eq!(store.anomalies(), 1);
    }

    #[test]
    fn test_negative_zero_price_is_one_level() {
        let mut store = SideStore::new(BookSide::Bid, 0);
        store.apply(&[bid(0.0, 1.0), bid(-0.0, 1.0)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0.0).map(|l| l.size), Some(2.0));
    }

    #[test]
    fn test_clear_resets_boundary() {
        let mut store = SideStore::new(BookSide::Bid, 1);
        store.apply(&[bid(10.0, 1.0), bid(9.0, 1.0)]);
        assert!(store.boundary().is_some());

        store.clear();
        assert!(store.is_empty());
        assert!(store.boundary().is_none());

        let changes = store.apply(&[bid(8.0, 1.0)]);
        assert_eq!(prices(&changes.additions), vec![8.0]);
    }

    #[test]
    fn test_window_size_tracks_depth() {
        let mut store = SideStore::new(BookSide::Ask, 3);
        for i in 0..10 {
            store.apply(&[ask(100.0 + i as f64, 1.0)]);
            assert_eq!(store.visible_count(), (i + 1).min(3));
        }
        for i in 0..10 {
            store.apply(&[ask(100.0 + i as f64, -1.0)]);
            assert_eq!(store.visible_count(), (9 - i).min(3));
        }
        assert!(store.boundary().is_none());
    }
}
