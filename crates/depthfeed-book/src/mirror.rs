//! Client-side replica of a book's visible window
//!
//! A [`BookMirror`] is rebuilt from a new-book notification and then kept in
//! step by incremental change payloads only. After every batch its window
//! should match the book's, which [`BookMirror::checksum`] lets a consumer
//! confirm cheaply.

use crate::changes::{BookChanges, SideLevels};
use crate::checksum::window_checksum;
use crate::storage::PriceKey;
use depthfeed_types::{BookSide, PriceLevel};
use std::collections::BTreeMap;

/// Replica of the visible window driven by emitted payloads
#[derive(Debug, Clone, Default)]
pub struct BookMirror {
    asks: BTreeMap<PriceKey, PriceLevel>,
    bids: BTreeMap<PriceKey, PriceLevel>,
    /// Changes that did not fit the mirrored state
    mismatches: u64,
}

impl BookMirror {
    /// Create an empty mirror
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirrored window (new-book notification)
    pub fn reset(&mut self, asks: &[PriceLevel], bids: &[PriceLevel]) {
        self.asks = Self::load(BookSide::Ask, asks);
        self.bids = Self::load(BookSide::Bid, bids);
    }

    /// Apply an incremental change payload
    pub fn apply(&mut self, changes: &BookChanges) {
        self.apply_side(BookSide::Ask, &changes.removals, &changes.additions, &changes.updates);
        self.apply_side(BookSide::Bid, &changes.removals, &changes.additions, &changes.updates);
    }

    /// Mirrored asks, best first
    pub fn asks(&self) -> Vec<PriceLevel> {
        self.asks.values().copied().collect()
    }

    /// Mirrored bids, best first
    pub fn bids(&self) -> Vec<PriceLevel> {
        self.bids.values().copied().collect()
    }

    /// Checksum of the mirrored window
    pub fn checksum(&self) -> u32 {
        window_checksum(&self.asks(), &self.bids())
    }

    /// Number of changes that contradicted the mirrored state
    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }

    fn load(side: BookSide, levels: &[PriceLevel]) -> BTreeMap<PriceKey, PriceLevel> {
        levels
            .iter()
            .map(|level| (PriceKey::new(side, level.price), *level))
            .collect()
    }

    fn apply_side(
        &mut self,
        side: BookSide,
        removals: &SideLevels,
        additions: &SideLevels,
        updates: &SideLevels,
    ) {
        let (levels, removals, additions, updates) = match side {
            BookSide::Ask => (&mut self.asks, &removals.asks, &additions.asks, &updates.asks),
            BookSide::Bid => (&mut self.bids, &removals.bids, &additions.bids, &updates.bids),
        };

        for level in removals {
            if levels.remove(&PriceKey::new(side, level.price)).is_none() {
                self.mismatches += 1;
            }
        }
        for level in additions {
            if levels.insert(PriceKey::new(side, level.price), *level).is_some() {
                self.mismatches += 1;
            }
        }
        for level in updates {
            match levels.get_mut(&PriceKey::new(side, level.price)) {
                Some(existing) => *existing = *level,
                None => self.mismatches += 1,
            }
        }
    }
}
