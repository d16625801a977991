use crate::engine::entry::{NewOrder, Order, OrderId, OrderStatus, Price, StockId, Trade, TradeId, Units};
use crate::engine::matchlogic::Settlement;
use crate::error::StoreError;
use crate::store::OrderStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    orders: BTreeMap<OrderId, Order>,
    trades: Vec<Trade>,
}

/// In-process store. Useful for dry runs and tests; `set_failing(true)` makes
/// every call fail as if the database were unreachable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(self.tables.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

fn write_status(
    tables: &mut Tables,
    order_id: OrderId,
    status: OrderStatus,
    units: Units,
) -> Result<(), StoreError> {
    let order = tables
        .orders
        .get_mut(&order_id)
        .ok_or(StoreError::NotFound(order_id))?;
    order.status = status;
    order.units = units;
    Ok(())
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, StoreError> {
        let mut tables = self.tables()?;
        let order_id = tables.orders.keys().next_back().map_or(1, |id| id + 1);
        tables
            .orders
            .insert(order_id, order.clone().into_order(order_id));
        Ok(order_id)
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        units: Units,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        write_status(&mut tables, order_id, status, units)
    }

    async fn record_trade(&self, settlement: &Settlement) -> Result<TradeId, StoreError> {
        let mut tables = self.tables()?;
        if let Some(done) = tables.trades.iter().find(|t| {
            t.buy_order_id == settlement.buy_order_id() && t.sell_order_id == settlement.sell_order_id()
        }) {
            return Ok(done.id);
        }
        for order_id in [settlement.buy_order_id(), settlement.sell_order_id()] {
            if !tables.orders.contains_key(&order_id) {
                return Err(StoreError::NotFound(order_id));
            }
        }
        for leg in [&settlement.buy, &settlement.sell] {
            write_status(&mut tables, leg.order_id, leg.status, leg.units)?;
        }
        let trade_id = tables.trades.len() as TradeId + 1;
        tables.trades.push(settlement.to_trade(trade_id));
        Ok(trade_id)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.tables()?.orders.values().cloned().collect())
    }

    async fn list_trades(&self, after: TradeId) -> Result<Vec<Trade>, StoreError> {
        Ok(self
            .tables()?
            .trades
            .iter()
            .filter(|t| t.id > after)
            .cloned()
            .collect())
    }

    async fn latest_prices(&self) -> Result<Vec<(StockId, Price)>, StoreError> {
        let tables = self.tables()?;
        let mut latest: HashMap<StockId, Price> = HashMap::new();
        for trade in &tables.trades {
            latest.insert(trade.stock_id, trade.sell_price);
        }
        let mut prices: Vec<_> = latest.into_iter().collect();
        prices.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(prices)
    }
}
