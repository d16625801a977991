//! Single-node order-matching core for a toy stock exchange.
//!
//! Orders are recorded in an [`store::OrderStore`], booked per stock, and
//! matched in price-time priority by [`engine::MatchingEngine`].

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;
pub mod store;

pub use engine::{MatchingEngine, NewOrder, Order, OrderSide, OrderStatus, Trade};
pub use error::{EngineError, StoreError};
