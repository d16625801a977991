//! Persistence Port
//!
//! The durable system of record for orders and trades. The matching core only
//! talks to it through [`OrderStore`]; connection handling stays behind the
//! adapter.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::engine::entry::{NewOrder, Order, OrderId, OrderStatus, Price, StockId, Trade, TradeId, Units};
use crate::engine::matchlogic::Settlement;
use crate::error::StoreError;
use async_trait::async_trait;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Durably records a new order and returns the id assigned to it.
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, StoreError>;

    /// Overwrites one order's status and remaining units.
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        units: Units,
    ) -> Result<(), StoreError>;

    /// Records the trade and both legs' new status as one atomic unit.
    /// Nothing is written when this fails.
    ///
    /// A buy/sell pair trades at most once, since every settlement fully
    /// fills one of its legs. Recording a pair that is already in the trade
    /// table writes nothing and returns the existing trade id.
    async fn record_trade(&self, settlement: &Settlement) -> Result<TradeId, StoreError>;

    /// Every order ever placed, in id order.
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Trades with an id greater than `after`, in id order.
    async fn list_trades(&self, after: TradeId) -> Result<Vec<Trade>, StoreError>;

    /// The sell price of the most recent trade per stock, highest price first.
    async fn latest_prices(&self) -> Result<Vec<(StockId, Price)>, StoreError>;
}
