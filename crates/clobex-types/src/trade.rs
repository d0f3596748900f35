//! Trade records produced by the matching engine.
//!
//! A [`Trade`] is the immutable record of one fill between an incoming
//! (taker) order and a resting (maker) order, always at the maker's price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderSide, Ticker, TradeId, TraderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic from the engine's fill sequence.
    pub id: TradeId,
    pub ticker: Ticker,
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    pub buyer: TraderId,
    pub seller: TraderId,
    /// Execution price (the maker's limit price).
    pub price: Decimal,
    /// Executed quantity in the base asset.
    pub quantity: Decimal,
    /// Quote amount = price × quantity.
    pub quote_amount: Decimal,
    /// Which side the taker was on.
    pub taker_side: OrderSide,
    /// Engine-wide fill sequence number.
    pub sequence: u64,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    #[must_use]
    pub fn taker_is_buyer(&self) -> bool {
        self.taker_side == OrderSide::Buy
    }

    #[must_use]
    pub fn taker(&self) -> TraderId {
        if self.taker_is_buyer() { self.buyer } else { self.seller }
    }

    #[must_use]
    pub fn maker(&self) -> TraderId {
        if self.taker_is_buyer() { self.seller } else { self.buyer }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} {} @ {} = {}",
            self.sequence,
            self.ticker,
            self.taker_side,
            self.quantity,
            self.price,
            self.quote_amount,
        )
    }
}
