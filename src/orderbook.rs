use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    errors::EngineError,
    orders::{Order, Side},
};

/// An [`OrderBook`] stores **resting** buy and sell orders for one symbol in
/// two separate [`BTreeMap`]s:
/// - `bids` (buy orders)
/// - `asks` (sell orders)
///
/// Each price level (key) holds a FIFO queue of orders in a [`VecDeque`].
/// Timestamps are assigned monotonically at submission, so FIFO within a
/// level realises the `(price, timestamp)` total order exactly: best price
/// first, earliest among equal prices first.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// Buy orders, keyed by price ascending; the best bid is the **last** key.
    bids: BTreeMap<Decimal, VecDeque<Order>>,

    /// Sell orders, keyed by price ascending; the best ask is the **first** key.
    asks: BTreeMap<Decimal, VecDeque<Order>>,
}

/// Read-only ordered listing of both sides, best price first. Used for the
/// `status` display; building one never mutates ordering state.
#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Inserts a resting order into the correct side.
    ///
    /// The order's own invariants were checked at construction; this re-checks
    /// them so a book can never hold a zero-quantity or free order, then
    /// appends to the FIFO queue at its price level. No other side effect.
    pub fn add_order(&mut self, order: Order) -> Result<(), EngineError> {
        if order.remaining == 0 {
            return Err(EngineError::InvalidOrder(
                "resting order must have remaining quantity > 0".to_string(),
            ));
        }
        if order.limit_price <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder(format!(
                "limit price must be > 0, got {}",
                order.limit_price
            )));
        }
        let book_side = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        book_side
            .entry(order.limit_price)
            .or_default()
            .push_back(order);
        Ok(())
    }

    /// Top-priority bid (highest price, earliest timestamp) without removal.
    pub fn peek_best_bid(&self) -> Option<&Order> {
        self.bids.values().next_back().and_then(|q| q.front())
    }

    /// Top-priority ask (lowest price, earliest timestamp) without removal.
    pub fn peek_best_ask(&self) -> Option<&Order> {
        self.asks.values().next().and_then(|q| q.front())
    }

    /// Removes and returns the top-priority bid.
    pub fn pop_best_bid(&mut self) -> Option<Order> {
        let price = *self.bids.keys().next_back()?;
        Self::pop_front_at(&mut self.bids, price)
    }

    /// Removes and returns the top-priority ask.
    pub fn pop_best_ask(&mut self) -> Option<Order> {
        let price = *self.asks.keys().next()?;
        Self::pop_front_at(&mut self.asks, price)
    }

    fn pop_front_at(
        side: &mut BTreeMap<Decimal, VecDeque<Order>>,
        price: Decimal,
    ) -> Option<Order> {
        let queue = side.get_mut(&price)?;
        let order = queue.pop_front();
        if queue.is_empty() {
            side.remove(&price);
        }
        order
    }

    /// Decrements the best bid's remaining quantity by `qty`, retiring the
    /// order (and pruning its level) when it reaches 0. Partial fills keep
    /// their position at the head of the queue: time priority is not reset.
    pub fn fill_best_bid(&mut self, qty: u64) {
        if let Some(price) = self.bids.keys().next_back().copied() {
            Self::fill_front_at(&mut self.bids, price, qty);
        }
    }

    /// Ask-side counterpart of [`fill_best_bid`](Self::fill_best_bid).
    pub fn fill_best_ask(&mut self, qty: u64) {
        if let Some(price) = self.asks.keys().next().copied() {
            Self::fill_front_at(&mut self.asks, price, qty);
        }
    }

    fn fill_front_at(side: &mut BTreeMap<Decimal, VecDeque<Order>>, price: Decimal, qty: u64) {
        if let Some(queue) = side.get_mut(&price) {
            if let Some(front) = queue.front_mut() {
                front.remaining = front.remaining.saturating_sub(qty);
                if front.remaining == 0 {
                    queue.pop_front();
                }
            }
            if queue.is_empty() {
                side.remove(&price);
            }
        }
    }

    /// Removes a specific order regardless of its position in the book.
    ///
    /// Linear in book size; cancels are rare relative to matches.
    pub fn cancel(&mut self, order_id: u64) -> Result<Order, EngineError> {
        for book_side in [&mut self.bids, &mut self.asks] {
            let mut found_at: Option<(Decimal, usize)> = None;
            for (price, queue) in book_side.iter() {
                if let Some(pos) = queue.iter().position(|o| o.id == order_id) {
                    found_at = Some((*price, pos));
                    break;
                }
            }
            if let Some((price, pos)) = found_at {
                // queue must exist, we just found the order in it
                let queue = book_side
                    .get_mut(&price)
                    .ok_or(EngineError::OrderNotFound(order_id))?;
                let order = queue
                    .remove(pos)
                    .ok_or(EngineError::OrderNotFound(order_id))?;
                if queue.is_empty() {
                    book_side.remove(&price);
                }
                return Ok(order);
            }
        }
        Err(EngineError::OrderNotFound(order_id))
    }

    /// Ordered listing of every resting order, best priority first on both sides.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            bids: self
                .bids
                .values()
                .rev()
                .flat_map(|q| q.iter().cloned())
                .collect(),
            asks: self
                .asks
                .values()
                .flat_map(|q| q.iter().cloned())
                .collect(),
        }
    }

    pub fn bid_count(&self) -> usize {
        self.bids.values().map(VecDeque::len).sum()
    }

    pub fn ask_count(&self) -> usize {
        self.asks.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order(id: u64, side: Side, price: Decimal, quantity: u64, timestamp: u64) -> Order {
        Order::new(id, 1, "AAPL", side, quantity, price, timestamp).unwrap()
    }

    #[test]
    fn test_best_bid_is_highest_price() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Buy, dec!(100), 5, 1)).unwrap();
        ob.add_order(sample_order(2, Side::Buy, dec!(102), 3, 2)).unwrap();
        ob.add_order(sample_order(3, Side::Buy, dec!(101), 4, 3)).unwrap();

        assert_eq!(ob.peek_best_bid().unwrap().id, 2);
        assert_eq!(ob.pop_best_bid().unwrap().limit_price, dec!(102));
        assert_eq!(ob.pop_best_bid().unwrap().limit_price, dec!(101));
        assert_eq!(ob.pop_best_bid().unwrap().limit_price, dec!(100));
        assert!(ob.pop_best_bid().is_none());
    }

    #[test]
    fn test_best_ask_is_lowest_price() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Sell, dec!(105), 5, 1)).unwrap();
        ob.add_order(sample_order(2, Side::Sell, dec!(103), 3, 2)).unwrap();

        assert_eq!(ob.peek_best_ask().unwrap().id, 2);
        assert_eq!(ob.pop_best_ask().unwrap().limit_price, dec!(103));
        assert_eq!(ob.pop_best_ask().unwrap().limit_price, dec!(105));
    }

    #[test]
    fn test_equal_prices_break_ties_by_timestamp() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(10, Side::Buy, dec!(100), 5, 7)).unwrap();
        ob.add_order(sample_order(11, Side::Buy, dec!(100), 5, 8)).unwrap();
        ob.add_order(sample_order(12, Side::Buy, dec!(100), 5, 9)).unwrap();

        assert_eq!(ob.pop_best_bid().unwrap().id, 10);
        assert_eq!(ob.pop_best_bid().unwrap().id, 11);
        assert_eq!(ob.pop_best_bid().unwrap().id, 12);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Sell, dec!(99), 2, 1)).unwrap();

        assert_eq!(ob.peek_best_ask().unwrap().id, 1);
        assert_eq!(ob.peek_best_ask().unwrap().id, 1);
        assert_eq!(ob.ask_count(), 1);
    }

    #[test]
    fn test_partial_fill_keeps_head_position() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Sell, dec!(100), 10, 1)).unwrap();
        ob.add_order(sample_order(2, Side::Sell, dec!(100), 10, 2)).unwrap();

        ob.fill_best_ask(4);
        let head = ob.peek_best_ask().unwrap();
        assert_eq!(head.id, 1);
        assert_eq!(head.remaining, 6);
        assert_eq!(head.timestamp, 1); // priority not reset

        ob.fill_best_ask(6);
        assert_eq!(ob.peek_best_ask().unwrap().id, 2);
        assert_eq!(ob.ask_count(), 1);
    }

    #[test]
    fn test_fill_prunes_empty_level() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Buy, dec!(100), 3, 1)).unwrap();
        ob.fill_best_bid(3);
        assert!(ob.is_empty());
    }

    #[test]
    fn test_cancel_middle_of_level() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Buy, dec!(100), 5, 1)).unwrap();
        ob.add_order(sample_order(2, Side::Buy, dec!(100), 5, 2)).unwrap();
        ob.add_order(sample_order(3, Side::Buy, dec!(100), 5, 3)).unwrap();

        let cancelled = ob.cancel(2).unwrap();
        assert_eq!(cancelled.id, 2);
        assert_eq!(ob.bid_count(), 2);
        assert_eq!(ob.pop_best_bid().unwrap().id, 1);
        assert_eq!(ob.pop_best_bid().unwrap().id, 3);
    }

    #[test]
    fn test_cancel_unknown_order() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Sell, dec!(99), 5, 1)).unwrap();
        assert!(matches!(ob.cancel(999), Err(EngineError::OrderNotFound(999))));
        assert_eq!(ob.ask_count(), 1);
    }

    #[test]
    fn test_cancel_prunes_empty_level() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Sell, dec!(99), 5, 1)).unwrap();
        ob.cancel(1).unwrap();
        assert!(ob.is_empty());
    }

    #[test]
    fn test_snapshot_is_priority_ordered() {
        let mut ob = OrderBook::new();
        ob.add_order(sample_order(1, Side::Buy, dec!(100), 1, 1)).unwrap();
        ob.add_order(sample_order(2, Side::Buy, dec!(102), 1, 2)).unwrap();
        ob.add_order(sample_order(3, Side::Buy, dec!(102), 1, 3)).unwrap();
        ob.add_order(sample_order(4, Side::Sell, dec!(105), 1, 4)).unwrap();
        ob.add_order(sample_order(5, Side::Sell, dec!(104), 1, 5)).unwrap();

        let snap = ob.snapshot();
        let bid_ids: Vec<u64> = snap.bids.iter().map(|o| o.id).collect();
        let ask_ids: Vec<u64> = snap.asks.iter().map(|o| o.id).collect();
        assert_eq!(bid_ids, vec![2, 3, 1]);
        assert_eq!(ask_ids, vec![5, 4]);

        // snapshot must not disturb ordering state
        assert_eq!(ob.peek_best_bid().unwrap().id, 2);
        assert_eq!(ob.peek_best_ask().unwrap().id, 5);
    }

    #[test]
    fn test_rejects_zero_quantity_resting_order() {
        let mut ob = OrderBook::new();
        let mut order = sample_order(1, Side::Buy, dec!(100), 5, 1);
        order.remaining = 0;
        assert!(matches!(
            ob.add_order(order),
            Err(EngineError::InvalidOrder(_))
        ));
        assert!(ob.is_empty());
    }
}
