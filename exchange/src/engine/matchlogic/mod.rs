//! Match Logic Module
//!
//! Per-stock matching state: a locked order book that yields crossing pairs in
//! price-time priority, and the settlement arithmetic applied to each pair.

pub mod matcher;
pub mod settlement;

pub use matcher::Matcher;
pub use settlement::Settlement;
