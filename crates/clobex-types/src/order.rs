//! Order types for the clobex matching engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, Ticker, TraderId};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side this order trades against.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The type of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderType {
    /// Crosses what it can at submission, rests the remainder.
    Limit,
    /// Immediate-or-cancel sweep; never rests.
    Market,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Core order struct.
///
/// `filled` only ever grows, and `0 <= filled <= quantity` always holds.
/// A limit order rests in the book while `filled < quantity` and is removed
/// the moment it becomes fully filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub trader: TraderId,
    pub ticker: Ticker,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Limit price; `None` for market orders.
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub filled: Decimal,
    /// Engine-assigned submission sequence; the time-priority tie-break.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Quantity still open.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.quantity - self.filled
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled >= self.quantity
    }

    /// Record `qty` more as filled. The caller guarantees
    /// `qty <= self.remaining()`.
    pub fn record_fill(&mut self, qty: Decimal) {
        debug_assert!(qty <= self.remaining(), "fill exceeds remaining quantity");
        self.filled += qty;
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy_limit(side: OrderSide, price: Decimal, qty: Decimal) -> Self {
        Self::dummy_limit_for(TraderId::new(), side, price, qty)
    }

    pub fn dummy_limit_for(
        trader: TraderId,
        side: OrderSide,
        price: Decimal,
        qty: Decimal,
    ) -> Self {
        Self {
            id: OrderId::new(),
            trader,
            ticker: Ticker::new("UNI"),
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity: qty,
            filled: Decimal::ZERO,
            sequence: 0,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}
