//! Match Engine Module
//!
//! This module contains the core components of the order-matching system:
//! - `data`: the per-stock order book in price-time priority
//! - `entry`: order and trade definitions
//! - `matchengine`: the engine that accepts orders and runs the matching loop
//! - `matchlogic`: locked per-stock matchers and trade settlement
//! - `spot`: the registry of books keyed by stock

pub mod data;
pub mod entry;
pub mod matchengine;
pub mod matchlogic;
pub mod spot;

pub use data::OrderBook;
pub use entry::{NewOrder, Order, OrderSide, OrderStatus, Trade};
pub use matchengine::{CycleOutcome, MatchingEngine};
pub use matchlogic::{Matcher, Settlement};
pub use spot::BookRegistry;
