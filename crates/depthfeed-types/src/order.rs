//! Raw order events and per-order state

use crate::enums::Side;
use crate::level::is_zero_size;
use serde::{Deserialize, Serialize};

/// A decoded order add/update/remove delivered by the order channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawOrderEvent {
    /// Order identifier, unique for the order's lifetime
    pub order_id: i64,
    /// Order price
    pub price: f64,
    /// Order size
    pub size: f64,
    /// Event time
    pub time: i64,
    /// Order side
    pub side: Side,
    /// Explicit removal flag
    #[serde(default)]
    pub removed: bool,
}

impl RawOrderEvent {
    /// Create a live order event
    pub fn new(order_id: i64, side: Side, price: f64, size: f64, time: i64) -> Self {
        Self {
            order_id,
            price,
            size,
            time,
            side,
            removed: false,
        }
    }

    /// Create an explicit removal event
    pub fn removal(order_id: i64, side: Side, price: f64, time: i64) -> Self {
        Self {
            order_id,
            price,
            size: 0.0,
            time,
            side,
            removed: true,
        }
    }

    /// Returns true if this event removes the order.
    ///
    /// Zero, NaN and negative sizes are removal sentinels.
    pub fn is_removal(&self) -> bool {
        self.removed || self.size.is_nan() || is_zero_size(self.size) || self.size < 0.0
    }
}

/// Last non-removed state of an order, as held in the order table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderContribution {
    /// Order price
    pub price: f64,
    /// Order size
    pub size: f64,
    /// Time of the last event for this order
    pub time: i64,
    /// Order side
    pub side: Side,
}

impl From<&RawOrderEvent> for OrderContribution {
    fn from(event: &RawOrderEvent) -> Self {
        Self {
            price: event.price,
            size: event.size,
            time: event.time,
            side: event.side,
        }
    }
}
