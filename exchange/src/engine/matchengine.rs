//! Match Engine Module
//!
//! Owns the per-stock books and drives them: any number of callers submit
//! orders through [`MatchingEngine::place_order`] while a single task runs
//! [`MatchingEngine::run_matcher`], which is the only writer of trade
//! settlement.

use crate::engine::entry::{NewOrder, Order, OrderSide, Price, StockId, Trade, Units};
use crate::engine::matchlogic::{Matcher, Settlement};
use crate::engine::spot::BookRegistry;
use crate::error::EngineError;
use crate::metrics;
use crate::store::OrderStore;
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

pub const DEFAULT_MATCH_INTERVAL: Duration = Duration::from_millis(50);

/// What one pass over every book produced.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Trades recorded during the pass, in settlement order
    pub trades: Vec<Trade>,
    /// Books that stopped on a settlement the store refused
    pub failures: Vec<EngineError>,
}

/// The main match engine implementation
pub struct MatchingEngine {
    books: BookRegistry,
    store: Arc<dyn OrderStore>,
    /// Pause between matching cycles
    interval: Duration,
    /// Signalled on every accepted order so the matcher wakes early
    wake: Notify,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self::with_interval(store, DEFAULT_MATCH_INTERVAL)
    }

    pub fn with_interval(store: Arc<dyn OrderStore>, interval: Duration) -> Self {
        Self {
            books: BookRegistry::new(),
            store,
            interval,
            wake: Notify::new(),
        }
    }

    /// Validates, durably records and then books a new order.
    ///
    /// The store write comes first: a failed placement leaves neither an id
    /// nor a book entry behind. Safe to call concurrently.
    pub async fn place_order(&self, order: NewOrder) -> Result<Order, EngineError> {
        if let Err(reason) = order.validate() {
            metrics::ORDERS_REJECTED.with_label_values(&["invalid"]).inc();
            warn!("rejected order {:?}: {}", order, reason);
            return Err(EngineError::InvalidOrder { reason });
        }
        let order_id = match self.store.insert_order(&order).await {
            Ok(id) => id,
            Err(e) => {
                metrics::ORDERS_REJECTED.with_label_values(&["persistence"]).inc();
                error!("failed to record order {:?}: {}", order, e);
                return Err(e.into());
            }
        };

        let mut order = order.into_order(order_id);
        order.sequence = self.books.get_or_create(order.stock_id).add(order.clone());
        metrics::ORDERS_PLACED.inc();
        info!(
            "placed {} order #{} on stock {}: {} @ {}",
            order.side, order.order_id, order.stock_id, order.units, order.price
        );
        self.wake.notify_one();
        Ok(order)
    }

    /// Rebuilds the books from the open orders held by the store, in arrival
    /// order. Meant to be called once, before matching starts.
    pub async fn recover(&self) -> Result<usize, EngineError> {
        let mut open: Vec<Order> = self
            .store
            .list_orders()
            .await?
            .into_iter()
            .filter(|o| o.status.is_open() && o.units > 0)
            .collect();
        open.sort_by_key(|o| o.order_id);
        let count = open.len();
        for order in open {
            self.books.get_or_create(order.stock_id).add(order);
        }
        if count > 0 {
            info!("recovered {} open orders into {} books", count, self.books.len());
        }
        Ok(count)
    }

    /// Runs matching cycles forever.
    pub async fn run_matcher(&self) {
        self.run_matcher_until(std::future::pending::<()>()).await
    }

    /// Runs matching cycles until `shutdown` completes. Between cycles the
    /// loop waits for the match interval or a new submission, whichever is
    /// first.
    pub async fn run_matcher_until<F: Future<Output = ()>>(&self, shutdown: F) {
        tokio::pin!(shutdown);
        info!("matcher started, interval {:?}", self.interval);
        loop {
            let outcome = self.run_cycle().await;
            for failure in &outcome.failures {
                error!("{}", failure);
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.wake.notified() => {}
            }
        }
        info!("matcher stopped");
    }

    /// One pass over every registered book: drain all crossing pairs of each
    /// book, settling each pair before the next is taken.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let start = Instant::now();
        let mut outcome = CycleOutcome::default();
        for matcher in self.books.matchers() {
            if let Err(e) = self.match_book(&matcher, &mut outcome.trades).await {
                outcome.failures.push(e);
            }
        }
        metrics::observe_cycle(start);
        outcome
    }

    async fn match_book(&self, matcher: &Matcher, trades: &mut Vec<Trade>) -> Result<(), EngineError> {
        if let Some(parked) = matcher.take_stalled() {
            info!(
                "retrying settlement of buy #{} / sell #{} on stock {}",
                parked.buy_order_id(),
                parked.sell_order_id(),
                parked.stock_id()
            );
            trades.push(self.commit(matcher, parked).await?);
        }
        while let Some((buy, sell)) = matcher.try_match() {
            trades.push(self.settle_trade(matcher, buy, sell).await?);
        }
        Ok(())
    }

    /// Fills both legs of a crossing pair, records the result and re-queues
    /// whatever is left of either leg at its original arrival position.
    async fn settle_trade(&self, matcher: &Matcher, buy: Order, sell: Order) -> Result<Trade, EngineError> {
        self.commit(matcher, Settlement::new(buy, sell)).await
    }

    async fn commit(&self, matcher: &Matcher, settlement: Settlement) -> Result<Trade, EngineError> {
        match self.store.record_trade(&settlement).await {
            Ok(trade_id) => {
                let trade = settlement.to_trade(trade_id);
                debug!(
                    "settled {} units on stock {}: buy #{} ({}) / sell #{} ({})",
                    trade.units,
                    trade.stock_id,
                    trade.buy_order_id,
                    settlement.buy.status,
                    trade.sell_order_id,
                    settlement.sell.status
                );
                for residual in settlement.into_residuals() {
                    matcher.restore(residual);
                }
                metrics::TRADES_SETTLED.inc();
                Ok(trade)
            }
            Err(source) => {
                metrics::SETTLEMENT_FAILURES.inc();
                let err = EngineError::SettlementStalled {
                    stock_id: settlement.stock_id(),
                    buy_order_id: settlement.buy_order_id(),
                    sell_order_id: settlement.sell_order_id(),
                    source,
                };
                matcher.park(settlement);
                Err(err)
            }
        }
    }

    pub fn best_bid(&self, stock_id: StockId) -> Option<Price> {
        self.books.get(stock_id)?.best_bid()
    }

    pub fn best_ask(&self, stock_id: StockId) -> Option<Price> {
        self.books.get(stock_id)?.best_ask()
    }

    pub fn stock_ids(&self) -> Vec<StockId> {
        self.books.stock_ids()
    }

    /// Copies of the orders resting in a stock's book.
    pub fn resting_orders(&self, stock_id: StockId) -> Vec<Order> {
        self.books
            .get(stock_id)
            .map(|m| m.snapshot())
            .unwrap_or_default()
    }

    /// Units in the book plus any held by a parked settlement.
    pub fn open_units(&self, stock_id: StockId) -> Units {
        self.books
            .get(stock_id)
            .map(|m| m.resting_units().saturating_add(m.stalled_units()))
            .unwrap_or(0)
    }

    pub fn is_stalled(&self, stock_id: StockId) -> bool {
        self.books.get(stock_id).map_or(false, |m| m.is_stalled())
    }

    /// Resting units on one side of a stock's book.
    pub fn side_units(&self, stock_id: StockId, side: OrderSide) -> Units {
        self.resting_orders(stock_id)
            .iter()
            .filter(|o| o.side == side)
            .fold(0, |total: Units, o| total.saturating_add(o.units))
    }
}
