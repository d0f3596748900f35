//! A single price level in the order book.
//!
//! Orders at the same price are stored in time priority (ascending
//! sequence) using a [`VecDeque`].

use std::collections::VecDeque;

use clobex_types::{Order, OrderId};
use rust_decimal::Decimal;

/// All resting orders at one price. The front of the deque has the
/// highest time priority and is filled first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    /// Insert keeping ascending sequence order. Sequences are normally
    /// monotonic, so this is an append.
    pub fn insert(&mut self, order: Order) {
        let pos = self
            .orders
            .iter()
            .rposition(|o| o.sequence <= order.sequence)
            .map_or(0, |p| p + 1);
        self.orders.insert(pos, order);
    }

    #[must_use]
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Total open quantity across all orders at this level.
    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.orders.iter().map(Order::remaining).sum()
    }

    /// Remove a specific order by ID.
    pub fn remove_order(&mut self, order_id: &OrderId) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == *order_id)?;
        self.orders.remove(pos)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }
}
