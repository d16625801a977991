use crate::engine::entry::{Order, OrderId, StockId, Trade, TradeId, Units};

/// Outcome of matching one crossing pair, ready to be made durable.
///
/// Both legs already carry their post-trade `units` and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub buy: Order,
    pub sell: Order,
    pub traded: Units,
}

impl Settlement {
    /// Fills both legs by `min(buy.units, sell.units)`.
    pub fn new(mut buy: Order, mut sell: Order) -> Self {
        debug_assert_eq!(buy.stock_id, sell.stock_id);
        debug_assert!(buy.price >= sell.price);
        let traded = buy.units.min(sell.units);
        buy.fill(traded);
        sell.fill(traded);
        Self { buy, sell, traded }
    }

    pub fn stock_id(&self) -> StockId {
        self.buy.stock_id
    }

    pub fn buy_order_id(&self) -> OrderId {
        self.buy.order_id
    }

    pub fn sell_order_id(&self) -> OrderId {
        self.sell.order_id
    }

    pub fn to_trade(&self, id: TradeId) -> Trade {
        Trade {
            id,
            buy_order_id: self.buy.order_id,
            sell_order_id: self.sell.order_id,
            stock_id: self.stock_id(),
            units: self.traded,
            buy_price: self.buy.price,
            sell_price: self.sell.price,
        }
    }

    /// Legs with units left, which go back to the book.
    pub fn into_residuals(self) -> impl Iterator<Item = Order> {
        [self.buy, self.sell].into_iter().filter(|o| !o.is_filled())
    }
}
