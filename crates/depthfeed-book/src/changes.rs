//! Change-sets emitted by the side stores
//!
//! A [`ChangeSet`] is the net difference between a side's visible window
//! before and after one batch. Each price appears in at most one of the
//! three lists, so a mirror can apply them in any order.

use crate::storage::PriceKey;
use depthfeed_types::PriceLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Visible-window changes for one side, each list ordered best to worst
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Levels that left the window, as they were last visible
    pub removals: Vec<PriceLevel>,
    /// Levels that entered the window
    pub additions: Vec<PriceLevel>,
    /// Visible levels whose size or time changed
    pub updates: Vec<PriceLevel>,
}

impl ChangeSet {
    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty() && self.updates.is_empty()
    }

    /// Total number of changed levels
    pub fn len(&self) -> usize {
        self.removals.len() + self.additions.len() + self.updates.len()
    }
}

/// A pair of level lists, one per side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideLevels {
    /// Ask levels
    pub asks: Vec<PriceLevel>,
    /// Bid levels
    pub bids: Vec<PriceLevel>,
}

impl SideLevels {
    /// Check if both sides are empty
    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }

    /// Number of levels across both sides
    pub fn len(&self) -> usize {
        self.asks.len() + self.bids.len()
    }
}

/// Two-sided incremental change payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookChanges {
    /// Levels removed from the window
    pub removals: SideLevels,
    /// Levels added to the window
    pub additions: SideLevels,
    /// Levels updated in place
    pub updates: SideLevels,
}

impl BookChanges {
    /// Merge per-side change-sets into the two-sided triple
    pub fn from_sides(asks: ChangeSet, bids: ChangeSet) -> Self {
        Self {
            removals: SideLevels {
                asks: asks.removals,
                bids: bids.removals,
            },
            additions: SideLevels {
                asks: asks.additions,
                bids: bids.additions,
            },
            updates: SideLevels {
                asks: asks.updates,
                bids: bids.updates,
            },
        }
    }

    /// Check if nothing changed on either side
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty() && self.updates.is_empty()
    }
}

/// First and last visible state of one price during a batch
#[derive(Debug, Clone, Copy)]
struct Touch {
    before: Option<PriceLevel>,
    after: Option<PriceLevel>,
}

/// Records window transitions during one `apply` and compacts them
#[derive(Debug, Default)]
pub(crate) struct WindowJournal {
    touched: BTreeMap<PriceKey, Touch>,
}

impl WindowJournal {
    /// A visible level left the window
    pub(crate) fn removed(&mut self, key: PriceKey, level: PriceLevel) {
        self.touched
            .entry(key)
            .or_insert(Touch {
                before: Some(level),
                after: None,
            })
            .after = None;
    }

    /// A level entered the window
    pub(crate) fn added(&mut self, key: PriceKey, level: PriceLevel) {
        self.touched
            .entry(key)
            .or_insert(Touch {
                before: None,
                after: None,
            })
            .after = Some(level);
    }

    /// A visible level changed in place
    pub(crate) fn updated(&mut self, key: PriceKey, old: PriceLevel, new: PriceLevel) {
        self.touched
            .entry(key)
            .or_insert(Touch {
                before: Some(old),
                after: None,
            })
            .after = Some(new);
    }

    /// Net change-set, best to worst
    pub(crate) fn into_change_set(self) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for touch in self.touched.into_values() {
            match (touch.before, touch.after) {
                (Some(before), None) => changes.removals.push(before),
                (None, Some(after)) => changes.additions.push(after),
                (Some(before), Some(after)) if before != after => changes.updates.push(after),
                _ => {}
            }
        }
        changes
    }
}
