//! Book Registry Module
//!
//! Maps stock ids to their matchers. Books are created lazily on the first
//! order for a stock and never removed.
//!
//! The registry lock only covers lookup and insertion of `Arc<Matcher>`
//! handles; it is always released before any book lock is taken.

use crate::engine::entry::StockId;
use crate::engine::matchlogic::Matcher;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of per-stock matchers owned by the matching engine
#[derive(Debug, Default)]
pub struct BookRegistry {
    /// Map of stock ids to their matchers
    books: RwLock<HashMap<StockId, Arc<Matcher>>>,
}

impl BookRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a stock's matcher
    ///
    /// # Arguments
    /// * `stock_id` - Stock to look up
    ///
    /// # Returns
    /// Shared handle to the matcher if the stock has seen an order, None otherwise
    pub fn get(&self, stock_id: StockId) -> Option<Arc<Matcher>> {
        self.books
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&stock_id)
            .cloned()
    }

    /// Retrieves a stock's matcher, creating an empty book if absent
    ///
    /// # Arguments
    /// * `stock_id` - Stock the matcher is for
    ///
    /// # Returns
    /// Shared handle to the (possibly new) matcher
    pub fn get_or_create(&self, stock_id: StockId) -> Arc<Matcher> {
        if let Some(matcher) = self.get(stock_id) {
            return matcher;
        }
        let mut books = self.books.write().unwrap_or_else(|e| e.into_inner());
        books
            .entry(stock_id)
            .or_insert_with(|| {
                log::info!("created order book for stock {}", stock_id);
                Arc::new(Matcher::new(stock_id))
            })
            .clone()
    }

    /// Lists all registered matchers
    ///
    /// # Returns
    /// Handles to every matcher, ordered by stock id
    pub fn matchers(&self) -> Vec<Arc<Matcher>> {
        let mut matchers: Vec<_> = self
            .books
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        matchers.sort_by_key(|m| m.stock_id());
        matchers
    }

    /// Lists the ids of all registered stocks in ascending order
    pub fn stock_ids(&self) -> Vec<StockId> {
        self.matchers().iter().map(|m| m.stock_id()).collect()
    }

    pub fn len(&self) -> usize {
        self.books.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
