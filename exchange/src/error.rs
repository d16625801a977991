use crate::engine::entry::{OrderId, StockId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or a write failed.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
    #[error("order {0} not found")]
    NotFound(OrderId),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before it could reach a book.
    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error(transparent)]
    PersistenceUnavailable(#[from] StoreError),

    /// A matched pair could not be recorded. The book for `stock_id` is held
    /// until the record is retried successfully.
    #[error("settlement of buy #{buy_order_id} / sell #{sell_order_id} on stock {stock_id} stalled: {source}")]
    SettlementStalled {
        stock_id: StockId,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        source: StoreError,
    },
}
