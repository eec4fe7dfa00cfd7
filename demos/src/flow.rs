//! Synthetic order flow
//!
//! Generates a plausible stream of adds, resizes, reprices and cancels
//! around a drifting mid price. Prices sit on a fixed tick and sizes are
//! whole lots.

use chrono::Utc;
use depthfeed_types::{RawOrderEvent, Side};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A live synthetic order
#[derive(Debug, Clone, Copy)]
struct LiveOrder {
    id: i64,
    side: Side,
    price: f64,
    size: f64,
}

/// Seeded generator of order batches for one instrument
pub struct OrderFlow {
    rng: StdRng,
    tick: f64,
    mid_ticks: i64,
    spread_ticks: i64,
    next_id: i64,
    live: Vec<LiveOrder>,
}

impl OrderFlow {
    /// Create a generator around `mid` with the given tick size
    pub fn new(seed: u64, mid: f64, tick: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            tick,
            mid_ticks: (mid / tick).round() as i64,
            spread_ticks: 30,
            next_id: 1,
            live: Vec::new(),
        }
    }

    /// Number of live orders
    pub fn live_orders(&self) -> usize {
        self.live.len()
    }

    /// Current mid price
    pub fn mid(&self) -> f64 {
        self.mid_ticks as f64 * self.tick
    }

    /// Forget all live orders and emit a fresh snapshot of `orders` orders
    pub fn snapshot(&mut self, orders: usize) -> Vec<RawOrderEvent> {
        self.live.clear();
        (0..orders).map(|_| self.add()).collect()
    }

    /// Emit one incremental batch of up to `max_events` events
    pub fn next_batch(&mut self, max_events: usize) -> Vec<RawOrderEvent> {
        if self.rng.gen_bool(0.2) {
            self.mid_ticks += self.rng.gen_range(-2..=2);
        }

        let count = self.rng.gen_range(1..=max_events.max(1));
        (0..count)
            .map(|_| match self.rng.gen_range(0..100) {
                _ if self.live.is_empty() => self.add(),
                0..=44 => self.add(),
                45..=64 => self.resize(),
                65..=74 => self.reprice(),
                _ => self.cancel(),
            })
            .collect()
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn price_for(&mut self, side: Side) -> f64 {
        let offset = self.rng.gen_range(1..=self.spread_ticks);
        let ticks = match side {
            Side::Buy => self.mid_ticks - offset,
            Side::Sell => self.mid_ticks + offset,
        };
        ticks as f64 * self.tick
    }

    fn lots(&mut self) -> f64 {
        f64::from(self.rng.gen_range(1u32..=10))
    }

    fn add(&mut self) -> RawOrderEvent {
        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let order = LiveOrder {
            id: self.next_id,
            side,
            price: self.price_for(side),
            size: self.lots(),
        };
        self.next_id += 1;
        self.live.push(order);
        RawOrderEvent::new(order.id, order.side, order.price, order.size, Self::now())
    }

    fn pick(&mut self) -> usize {
        self.rng.gen_range(0..self.live.len())
    }

    fn resize(&mut self) -> RawOrderEvent {
        let index = self.pick();
        let size = self.lots();
        let order = &mut self.live[index];
        order.size = size;
        RawOrderEvent::new(order.id, order.side, order.price, order.size, Self::now())
    }

    fn reprice(&mut self) -> RawOrderEvent {
        let index = self.pick();
        let side = self.live[index].side;
        let price = self.price_for(side);
        let order = &mut self.live[index];
        order.price = price;
        RawOrderEvent::new(order.id, order.side, order.price, order.size, Self::now())
    }

    fn cancel(&mut self) -> RawOrderEvent {
        let index = self.pick();
        let order = self.live.swap_remove(index);
        RawOrderEvent::removal(order.id, order.side, order.price, Self::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_resets_live_orders() {
        let mut flow = OrderFlow::new(7, 100.0, 0.25);
        assert_eq!(flow.snapshot(20).len(), 20);
        flow.next_batch(5);
        assert_eq!(flow.snapshot(3).len(), 3);
        assert_eq!(flow.live_orders(), 3);
    }

    #[test]
    fn test_prices_straddle_mid() {
        let mut flow = OrderFlow::new(11, 100.0, 0.25);
        for event in flow.snapshot(200) {
            match event.side {
                Side::Buy => assert!(event.price < flow.mid()),
                Side::Sell => assert!(event.price > flow.mid()),
            }
        }
    }
}
