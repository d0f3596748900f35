//! What a submitted order turned into.

use clobex_types::{Order, Trade};
use rust_decimal::Decimal;
use serde::Serialize;

/// Final state of an order once `limit_order` / `market_order` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Completely filled on submission.
    Filled,
    /// Limit order with a remainder now resting in the book (it may have
    /// filled partially first).
    Resting,
    /// Market order that filled some but not all of its amount; the rest
    /// was discarded.
    PartiallyFilled,
    /// Market order that found nothing to fill against; it expired
    /// without a trade.
    Expired,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderOutcome {
    /// The order as it stood after matching (`filled` reflects the fills).
    pub order: Order,
    /// Fills in execution order.
    pub trades: Vec<Trade>,
    pub status: OrderStatus,
}

impl OrderOutcome {
    #[must_use]
    pub fn filled_quantity(&self) -> Decimal {
        self.order.filled
    }

    /// Quote amount that changed hands across all fills.
    #[must_use]
    pub fn quote_volume(&self) -> Decimal {
        self.trades.iter().map(|t| t.quote_amount).sum()
    }
}
