//! Price level types

use crate::enums::BookSide;
use serde::{Deserialize, Serialize};

/// Tolerance used for every zero and equality test on sizes and prices
pub const SIZE_EPSILON: f64 = f64::EPSILON;

/// Check if a size is zero within [`SIZE_EPSILON`]
pub fn is_zero_size(size: f64) -> bool {
    size.abs() < SIZE_EPSILON
}

/// Check if two values are equal within [`SIZE_EPSILON`]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < SIZE_EPSILON
}

/// A single aggregated price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price of this level
    pub price: f64,
    /// Total size of all live orders at this price
    pub size: f64,
    /// Time of the most recent change to this level
    pub time: i64,
}

impl PriceLevel {
    /// Create a new price level
    pub fn new(price: f64, size: f64, time: i64) -> Self {
        Self { price, size, time }
    }

    /// Check if this level has zero size (should not be stored)
    pub fn is_zero(&self) -> bool {
        is_zero_size(self.size)
    }
}

/// A signed size contribution to be merged into a [`PriceLevel`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelDelta {
    /// Price of the affected level
    pub price: f64,
    /// Book side of the affected level
    pub side: BookSide,
    /// Signed size change
    pub size_change: f64,
    /// Time of the last event contributing to this delta
    pub time: i64,
    /// The last live order at this price left during the batch.
    ///
    /// When set, `size_change` is the size contributed after that point and
    /// replaces the stored size instead of adjusting it.
    #[serde(default)]
    pub emptied: bool,
}

impl LevelDelta {
    /// Create a new level delta
    pub fn new(side: BookSide, price: f64, size_change: f64, time: i64) -> Self {
        Self {
            price,
            side,
            size_change,
            time,
            emptied: false,
        }
    }

    /// Delta for a level whose last live order left
    pub fn emptied(side: BookSide, price: f64, time: i64) -> Self {
        Self {
            emptied: true,
            ..Self::new(side, price, 0.0, time)
        }
    }

    /// Size of the level after applying this delta to `stored`
    pub fn resulting_size(&self, stored: f64) -> f64 {
        if self.emptied {
            self.size_change
        } else {
            stored + self.size_change
        }
    }

    /// Check if the delta has no effect
    pub fn is_zero(&self) -> bool {
        !self.emptied && is_zero_size(self.size_change)
    }
}
