//! Shared order book cache

use super::book::{OrderBookSnapshot, NEUTRAL_IMBALANCE};
use crate::instrument::Venue;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Latest snapshot per (venue, lowercase symbol)
#[derive(Debug, Default)]
pub struct OrderBookCache {
    books: RwLock<HashMap<(Venue, String), OrderBookSnapshot>>,
}

impl OrderBookCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot for an instrument
    pub fn insert(&self, venue: Venue, symbol: &str, snapshot: OrderBookSnapshot) {
        self.books
            .write()
            .insert((venue, symbol.to_lowercase()), snapshot);
    }

    pub fn get(&self, venue: Venue, symbol: &str) -> Option<OrderBookSnapshot> {
        self.books
            .read()
            .get(&(venue, symbol.to_lowercase()))
            .cloned()
    }

    /// Drop the snapshot for an instrument; returns whether one existed
    pub fn remove(&self, venue: Venue, symbol: &str) -> bool {
        self.books
            .write()
            .remove(&(venue, symbol.to_lowercase()))
            .is_some()
    }

    pub fn contains(&self, venue: Venue, symbol: &str) -> bool {
        self.books
            .read()
            .contains_key(&(venue, symbol.to_lowercase()))
    }

    /// Bid share over the top `depth` levels; 50 when nothing is cached
    pub fn imbalance(&self, venue: Venue, symbol: &str, depth: usize) -> Decimal {
        self.books
            .read()
            .get(&(venue, symbol.to_lowercase()))
            .map_or(NEUTRAL_IMBALANCE, |book| book.imbalance(depth))
    }

    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}
