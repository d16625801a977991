use crate::engine::data::OrderBook;
use crate::engine::entry::{Order, Price, StockId, Units};
use crate::engine::matchlogic::Settlement;
use std::sync::{Mutex, MutexGuard};

/// One stock's book behind its own lock.
///
/// The lock is only held for the duration of a single book operation and is
/// never held across a store call.
#[derive(Debug)]
pub struct Matcher {
    stock_id: StockId,
    orderbook: Mutex<OrderBook>,
    // A settlement the store refused. While present the book is not matched.
    stalled: Mutex<Option<Settlement>>,
}

impl Matcher {
    pub fn new(stock_id: StockId) -> Self {
        Self {
            stock_id,
            orderbook: Mutex::new(OrderBook::new(stock_id)),
            stalled: Mutex::new(None),
        }
    }

    pub fn stock_id(&self) -> StockId {
        self.stock_id
    }

    fn book(&self) -> MutexGuard<'_, OrderBook> {
        self.orderbook.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add(&self, order: Order) -> u64 {
        self.book().add_order(order)
    }

    pub fn restore(&self, order: Order) {
        self.book().restore_order(order)
    }

    /// Check-and-remove of the best crossing pair under one lock acquisition.
    pub fn try_match(&self) -> Option<(Order, Order)> {
        self.book().try_match()
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.book().get_best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.book().get_best_ask()
    }

    pub fn resting_units(&self) -> Units {
        self.book().resting_units()
    }

    pub fn snapshot(&self) -> Vec<Order> {
        self.book().orders()
    }

    fn stalled_slot(&self) -> MutexGuard<'_, Option<Settlement>> {
        self.stalled.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn park(&self, settlement: Settlement) {
        *self.stalled_slot() = Some(settlement);
    }

    pub fn take_stalled(&self) -> Option<Settlement> {
        self.stalled_slot().take()
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled_slot().is_some()
    }

    /// Units held by a parked settlement that have not yet gone back to the book.
    pub fn stalled_units(&self) -> Units {
        self.stalled_slot()
            .as_ref()
            .map(|s| s.buy.units.saturating_add(s.sell.units))
            .unwrap_or(0)
    }
}
