pub mod order;
pub mod trade;

pub use order::{NewOrder, Order, OrderId, OrderSide, OrderStatus, Price, StockId, TradeId, Units, UserId};
pub use trade::Trade;
