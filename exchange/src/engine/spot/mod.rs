//! Spot Market Module
//!
//! - `book_registry`: owns one matcher per listed stock

pub mod book_registry;

pub use book_registry::BookRegistry;
