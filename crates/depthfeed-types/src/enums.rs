//! Order side and book side enums

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Side of an individual order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (rests on the bid side)
    Buy,
    /// Sell order (rests on the ask side)
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Book side this order rests on
    pub fn book_side(&self) -> BookSide {
        match self {
            Self::Buy => BookSide::Bid,
            Self::Sell => BookSide::Ask,
        }
    }
}

/// One side of the aggregated book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    /// Bids, ranked by descending price
    Bid,
    /// Asks, ranked by ascending price
    Ask,
}

impl BookSide {
    /// Returns the side name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bid => "bid",
            Self::Ask => "ask",
        }
    }

    /// Rank two prices on this side.
    ///
    /// `Less` means `a` is the better price. A NaN price is the
    /// "past the end of book" sentinel: strictly worse than every real price
    /// on both sides, and equal to another NaN.
    pub fn rank(&self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                Self::Ask => a.total_cmp(&b),
                Self::Bid => b.total_cmp(&a),
            },
        }
    }

    /// Returns true if `a` ranks strictly better than `b`
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        self.rank(a, b) == Ordering::Less
    }
}
