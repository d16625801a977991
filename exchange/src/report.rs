//! Read-side views over the order store.
//!
//! Nothing here touches a book; everything is derived from store snapshots.

use crate::engine::entry::{Order, OrderSide, Price, StockId, Trade, TradeId};
use crate::error::StoreError;
use crate::store::OrderStore;
use std::collections::BTreeMap;
use std::fmt;

/// Best resting prices of one stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub stock_id: StockId,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stock {} | Bid: {} | Ask: {}",
            self.stock_id,
            self.best_bid.unwrap_or(0),
            self.best_ask.unwrap_or(0)
        )
    }
}

/// Best bid and ask per stock over the open orders in `orders`.
pub fn market_overview(orders: &[Order]) -> Vec<Quote> {
    let mut quotes: BTreeMap<StockId, Quote> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.status.is_open()) {
        let quote = quotes.entry(order.stock_id).or_insert(Quote {
            stock_id: order.stock_id,
            best_bid: None,
            best_ask: None,
        });
        match order.side {
            OrderSide::Buy => {
                quote.best_bid = Some(quote.best_bid.map_or(order.price, |p| p.max(order.price)))
            }
            OrderSide::Sell => {
                quote.best_ask = Some(quote.best_ask.map_or(order.price, |p| p.min(order.price)))
            }
        }
    }
    quotes.into_values().collect()
}

pub fn format_order(order: &Order) -> String {
    format!(
        "ID#{} | S{} | U{} | {} @ {} | {} / {}",
        order.order_id, order.stock_id, order.user_id, order.units, order.price, order.status, order.side
    )
}

pub fn format_trade(trade: &Trade) -> String {
    format!(
        "TX#{} | B#{} / S#{} | S{} | {} @ {}",
        trade.id, trade.buy_order_id, trade.sell_order_id, trade.stock_id, trade.units, trade.sell_price
    )
}

/// Follows the trade table, yielding each trade once.
#[derive(Debug, Default)]
pub struct TradeTail {
    last_id: TradeId,
}

impl TradeTail {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn poll(&mut self, store: &dyn OrderStore) -> Result<Vec<Trade>, StoreError> {
        let trades = store.list_trades(self.last_id).await?;
        if let Some(last) = trades.last() {
            self.last_id = last.id;
        }
        Ok(trades)
    }
}
