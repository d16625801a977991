//! Data Structures Module
//!
//! The per-stock order book: two priority-ordered sides of resting orders.

pub mod orderbook;

pub use orderbook::OrderBook;
