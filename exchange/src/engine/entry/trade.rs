//! Trade Types and Structures
//!
//! A trade is the durable record of one settled crossing pair.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::order::{OrderId, Price, StockId, TradeId, Units};

/// Represents a completed trade in the system
///
/// Both legs keep their own limit price: a crossing match has no single
/// clearing price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Identifier assigned by the store
    pub id: TradeId,
    /// ID of the buyer's order
    pub buy_order_id: OrderId,
    /// ID of the seller's order
    pub sell_order_id: OrderId,
    /// Stock the trade happened on
    pub stock_id: StockId,
    /// Quantity exchanged
    pub units: Units,
    /// Limit price of the buy leg
    pub buy_price: Price,
    /// Limit price of the sell leg
    pub sell_price: Price,
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[TX {}] Stock {} | Qty {} @ {} (B#{} / S#{})",
            self.id, self.stock_id, self.units, self.sell_price, self.buy_order_id, self.sell_order_id
        )
    }
}
