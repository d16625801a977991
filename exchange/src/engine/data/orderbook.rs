use crate::engine::entry::{Order, OrderSide, Price, StockId, Units};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Bids sort by descending price, then arrival.
type BidKey = (Reverse<Price>, u64);
/// Asks sort by ascending price, then arrival.
type AskKey = (Price, u64);

/// Resting orders of one stock in price-time priority.
///
/// Every contained order has `units > 0` and an open status.
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub stock_id: StockId,
    bids: BTreeMap<BidKey, Order>,
    asks: BTreeMap<AskKey, Order>,
    next_sequence: u64,
}

impl OrderBook {
    pub fn new(stock_id: StockId) -> Self {
        Self {
            stock_id,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Inserts a newly arrived order behind every order already seen.
    /// Returns the sequence number it was given.
    pub fn add_order(&mut self, mut order: Order) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        order.sequence = sequence;
        self.insert(order);
        sequence
    }

    /// Puts a partially filled order back at its original arrival position.
    pub fn restore_order(&mut self, order: Order) {
        debug_assert!(order.sequence < self.next_sequence);
        self.insert(order);
    }

    fn insert(&mut self, order: Order) {
        debug_assert_eq!(order.stock_id, self.stock_id);
        debug_assert!(order.units > 0 && order.status.is_open());
        match order.side {
            OrderSide::Buy => {
                self.bids.insert((Reverse(order.price), order.sequence), order);
            }
            OrderSide::Sell => {
                self.asks.insert((order.price, order.sequence), order);
            }
        }
    }

    /// Pops the best bid and best ask if they cross, leaving the book
    /// untouched otherwise.
    pub fn try_match(&mut self) -> Option<(Order, Order)> {
        let (&(Reverse(bid), _), _) = self.bids.first_key_value()?;
        let (&(ask, _), _) = self.asks.first_key_value()?;
        if bid < ask {
            return None;
        }
        let (_, buy) = self.bids.pop_first()?;
        let (_, sell) = self.asks.pop_first()?;
        Some((buy, sell))
    }

    pub fn get_best_bid(&self) -> Option<Price> {
        self.bids.keys().next().map(|&(Reverse(price), _)| price)
    }

    pub fn get_best_ask(&self) -> Option<Price> {
        self.asks.keys().next().map(|&(price, _)| price)
    }

    pub fn get_spread(&self) -> Option<Price> {
        match (self.get_best_ask(), self.get_best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn resting_units(&self) -> Units {
        self.bids
            .values()
            .chain(self.asks.values())
            .fold(0, |total: Units, o| total.saturating_add(o.units))
    }

    /// Copies of all resting orders, bids first, each side in priority order.
    pub fn orders(&self) -> Vec<Order> {
        self.bids.values().chain(self.asks.values()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::entry::NewOrder;
    use rand::{Rng, SeedableRng};

    fn order(id: i64, side: OrderSide, units: Units, price: Price) -> Order {
        NewOrder::new(1, 1, side, units, price).into_order(id)
    }

    #[test]
    fn empty_book_has_no_prices_or_matches() {
        let mut book = OrderBook::new(1);
        assert_eq!(book.get_best_bid(), None);
        assert_eq!(book.get_best_ask(), None);
        assert!(book.try_match().is_none());

        book.add_order(order(1, OrderSide::Buy, 5, 100));
        assert!(book.try_match().is_none());
        assert_eq!(book.bid_count(), 1);
    }

    #[test]
    fn best_prices_track_extremes() {
        let mut book = OrderBook::new(1);
        book.add_order(order(1, OrderSide::Buy, 5, 90));
        book.add_order(order(2, OrderSide::Buy, 5, 92));
        book.add_order(order(3, OrderSide::Buy, 5, 91));
        book.add_order(order(4, OrderSide::Sell, 5, 99));
        book.add_order(order(5, OrderSide::Sell, 5, 97));
        book.add_order(order(6, OrderSide::Sell, 5, 98));

        assert_eq!(book.get_best_bid(), Some(92));
        assert_eq!(book.get_best_ask(), Some(97));
        assert_eq!(book.get_spread(), Some(5));
    }

    #[test]
    fn random_adds_keep_best_prices_at_extremes() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut book = OrderBook::new(1);
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for id in 0..500 {
            let price = rng.gen_range(1..=200);
            if rng.gen_bool(0.5) {
                book.add_order(order(id, OrderSide::Buy, 1, price));
                bids.push(price);
            } else {
                book.add_order(order(id, OrderSide::Sell, 1, price));
                asks.push(price);
            }
            assert_eq!(book.get_best_bid(), bids.iter().copied().max());
            assert_eq!(book.get_best_ask(), asks.iter().copied().min());
        }
    }

    #[test]
    fn no_cross_leaves_book_unchanged() {
        let mut book = OrderBook::new(1);
        book.add_order(order(1, OrderSide::Buy, 5, 90));
        book.add_order(order(2, OrderSide::Sell, 5, 95));

        assert!(book.try_match().is_none());
        assert_eq!(book.get_best_bid(), Some(90));
        assert_eq!(book.get_best_ask(), Some(95));
        assert_eq!(book.resting_units(), 10);
    }

    #[test]
    fn crossing_pair_is_removed() {
        let mut book = OrderBook::new(1);
        book.add_order(order(1, OrderSide::Buy, 5, 100));
        book.add_order(order(2, OrderSide::Sell, 5, 100));

        let (buy, sell) = book.try_match().unwrap();
        assert_eq!((buy.order_id, sell.order_id), (1, 2));
        assert!(book.is_empty());
    }

    #[test]
    fn equal_prices_match_in_arrival_order() {
        let mut book = OrderBook::new(1);
        for id in 1..=4 {
            book.add_order(order(id, OrderSide::Sell, 1, 100));
        }
        for id in 5..=8 {
            book.add_order(order(id, OrderSide::Buy, 1, 100));
        }

        let mut pairs = Vec::new();
        while let Some((buy, sell)) = book.try_match() {
            pairs.push((buy.order_id, sell.order_id));
        }
        assert_eq!(pairs, vec![(5, 1), (6, 2), (7, 3), (8, 4)]);
    }

    #[test]
    fn better_price_beats_earlier_arrival() {
        let mut book = OrderBook::new(1);
        book.add_order(order(1, OrderSide::Sell, 1, 101));
        book.add_order(order(2, OrderSide::Sell, 1, 100));
        book.add_order(order(3, OrderSide::Buy, 1, 105));

        let (_, sell) = book.try_match().unwrap();
        assert_eq!(sell.order_id, 2);
    }

    #[test]
    fn restored_order_keeps_its_place_in_line() {
        let mut book = OrderBook::new(1);
        book.add_order(order(1, OrderSide::Sell, 10, 100));
        book.add_order(order(2, OrderSide::Buy, 4, 100));
        let (_, mut first) = book.try_match().unwrap();
        book.add_order(order(3, OrderSide::Sell, 10, 100));

        first.fill(4);
        book.restore_order(first);
        book.add_order(order(4, OrderSide::Buy, 1, 100));

        let (_, sell) = book.try_match().unwrap();
        assert_eq!(sell.order_id, 1);
        assert_eq!(sell.units, 6);
    }
}
