//! The order book for a single ticker.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Decimal>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<Decimal, PriceLevel>` -- lowest price first
//!
//! Insertion is O(log L) to find the level plus a scan inside it; the best
//! order of a side is the front of the first level. An auxiliary
//! `HashMap<OrderId, (Side, Price)>` lets the engine remove exactly the
//! order that was exhausted, wherever it sits.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use clobex_types::{ClobError, Order, OrderId, OrderSide, OrderType, Result, Ticker};
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

#[derive(Debug)]
pub struct OrderBook {
    /// The ticker this book serves.
    pub ticker: Ticker,
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<Decimal, PriceLevel>,
    /// `OrderId -> (side, price)` for exact removal.
    index: HashMap<OrderId, (OrderSide, Decimal)>,
}

impl OrderBook {
    #[must_use]
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion
    // =================================================================

    /// Insert a resting limit order at its price-time position.
    ///
    /// # Errors
    /// `InvalidOrder` if the order is not a priced, unfilled limit order of
    /// this ticker; `DuplicateOrder` if the id is already resting.
    pub fn insert_sorted(&mut self, order: Order) -> Result<()> {
        let price = self.restable_price(&order)?;
        if self.index.contains_key(&order.id) {
            return Err(ClobError::DuplicateOrder(order.id));
        }

        self.index.insert(order.id, (order.side, price));
        match order.side {
            OrderSide::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .insert(order),
            OrderSide::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .insert(order),
        }
        Ok(())
    }

    fn restable_price(&self, order: &Order) -> Result<Decimal> {
        if order.order_type != OrderType::Limit {
            return Err(ClobError::InvalidOrder {
                reason: format!("{} orders never rest", order.order_type),
            });
        }
        if order.ticker != self.ticker {
            return Err(ClobError::InvalidOrder {
                reason: format!("order for {} offered to {} book", order.ticker, self.ticker),
            });
        }
        if order.is_filled() {
            return Err(ClobError::InvalidOrder {
                reason: "fully filled orders never rest".into(),
            });
        }
        match order.price {
            Some(price) if price > Decimal::ZERO => Ok(price),
            _ => Err(ClobError::InvalidOrder {
                reason: "resting orders need a positive price".into(),
            }),
        }
    }

    // =================================================================
    // Removal
    // =================================================================

    /// Remove exactly `order_id` from `side`, wherever it sits in the book.
    /// Empty price levels are dropped.
    pub fn remove_filled(&mut self, side: OrderSide, order_id: &OrderId) -> Result<Order> {
        let (indexed_side, price) = *self
            .index
            .get(order_id)
            .ok_or(ClobError::OrderNotFound(*order_id))?;
        if indexed_side != side {
            return Err(ClobError::OrderNotFound(*order_id));
        }

        let order = match side {
            OrderSide::Buy => {
                let level = self
                    .bids
                    .get_mut(&Reverse(price))
                    .ok_or(ClobError::OrderNotFound(*order_id))?;
                let order = level
                    .remove_order(order_id)
                    .ok_or(ClobError::OrderNotFound(*order_id))?;
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                order
            }
            OrderSide::Sell => {
                let level = self
                    .asks
                    .get_mut(&price)
                    .ok_or(ClobError::OrderNotFound(*order_id))?;
                let order = level
                    .remove_order(order_id)
                    .ok_or(ClobError::OrderNotFound(*order_id))?;
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                order
            }
        };

        self.index.remove(order_id);
        Ok(order)
    }

    /// Drain all orders from the book, bids first, each side best-first.
    pub fn drain_all(&mut self) -> Vec<Order> {
        let mut all = Vec::with_capacity(self.order_count());
        self.index.clear();
        for level in std::mem::take(&mut self.bids).into_values() {
            all.extend(level.orders);
        }
        for level in std::mem::take(&mut self.asks).into_values() {
            all.extend(level.orders);
        }
        all
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Highest-priority bid.
    #[must_use]
    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.values().next().and_then(PriceLevel::front)
    }

    /// Highest-priority ask.
    #[must_use]
    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.values().next().and_then(PriceLevel::front)
    }

    #[must_use]
    pub fn best_bid_price(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    #[must_use]
    pub fn best_ask_price(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Spread = best_ask - best_bid. `None` if either side is empty.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Resting orders of a side in priority order.
    #[must_use]
    pub fn orders(&self, side: OrderSide) -> Vec<Order> {
        self.levels(side)
            .flat_map(|level| level.orders.iter().cloned())
            .collect()
    }

    /// Aggregated `(price, open quantity)` for the best `max_levels` levels.
    #[must_use]
    pub fn depth(&self, side: OrderSide, max_levels: usize) -> Vec<(Decimal, Decimal)> {
        self.levels(side)
            .take(max_levels)
            .map(|level| (level.price, level.total_quantity()))
            .collect()
    }

    /// Price levels of a side, best first.
    pub fn levels(&self, side: OrderSide) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match side {
            OrderSide::Buy => Box::new(self.bids.values()),
            OrderSide::Sell => Box::new(self.asks.values()),
        }
    }

    /// Mutable access to a resting order by id.
    pub fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut Order> {
        let (side, price) = *self.index.get(order_id)?;
        let level = match side {
            OrderSide::Buy => self.bids.get_mut(&Reverse(price))?,
            OrderSide::Sell => self.asks.get_mut(&price)?,
        };
        level.orders.iter_mut().find(|o| o.id == *order_id)
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains_order(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Best bid at or above best ask.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        matches!(
            (self.best_bid_price(), self.best_ask_price()),
            (Some(bid), Some(ask)) if bid >= ask
        )
    }

    // =================================================================
    // Invariants
    // =================================================================

    /// Check fill bounds, price-time ordering on both sides, index
    /// consistency, and that the book is not crossed.
    pub fn check_invariants(&self) -> Result<()> {
        let violation = |reason: String| ClobError::BookInvariantViolation { reason };

        for side in [OrderSide::Buy, OrderSide::Sell] {
            let mut prev: Option<(Decimal, u64)> = None;
            for level in self.levels(side) {
                if level.is_empty() {
                    return Err(violation(format!("empty {side} level at {}", level.price)));
                }
                for order in &level.orders {
                    if order.filled < Decimal::ZERO || order.filled >= order.quantity {
                        return Err(violation(format!(
                            "order {} rests with filled {} of {}",
                            order.id, order.filled, order.quantity
                        )));
                    }
                    if order.side != side || order.price != Some(level.price) {
                        return Err(violation(format!(
                            "order {} sits on the wrong level",
                            order.id
                        )));
                    }
                    if let Some((prev_price, prev_seq)) = prev {
                        let price_ok = match side {
                            OrderSide::Buy => level.price <= prev_price,
                            OrderSide::Sell => level.price >= prev_price,
                        };
                        let time_ok = level.price != prev_price || order.sequence >= prev_seq;
                        if !price_ok || !time_ok {
                            return Err(violation(format!(
                                "{side} order {} breaks price-time priority",
                                order.id
                            )));
                        }
                    }
                    prev = Some((level.price, order.sequence));
                }
            }
        }

        let resting: usize = self
            .bids
            .values()
            .chain(self.asks.values())
            .map(PriceLevel::len)
            .sum();
        if resting != self.index.len() {
            return Err(violation(format!(
                "index tracks {} orders, levels hold {resting}",
                self.index.len()
            )));
        }

        if self.is_crossed() {
            return Err(violation(format!(
                "crossed book: bid {:?} >= ask {:?}",
                self.best_bid_price(),
                self.best_ask_price()
            )));
        }
        Ok(())
    }
}
