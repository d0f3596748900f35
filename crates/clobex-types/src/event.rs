//! Events emitted by the exchange for observability.
//!
//! Every successful state change and every rejected order produces one
//! [`ExchangeEvent`]. The engine keeps them in an in-memory journal that
//! the host drains; nothing here is persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AssetRef, OrderId, OrderSide, Ticker, Trade, TraderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExchangeEvent {
    TokenAdded {
        ticker: Ticker,
        asset_ref: AssetRef,
    },
    TokenRemoved {
        ticker: Ticker,
        /// Resting orders drained from the ticker's book.
        drained_orders: usize,
    },
    Deposited {
        trader: TraderId,
        ticker: Ticker,
        amount: Decimal,
    },
    Withdrawn {
        trader: TraderId,
        ticker: Ticker,
        amount: Decimal,
    },
    OrderRested {
        order_id: OrderId,
        trader: TraderId,
        ticker: Ticker,
        side: OrderSide,
        price: Decimal,
        remaining: Decimal,
    },
    TradeExecuted(Trade),
    OrderRejected {
        trader: TraderId,
        ticker: Ticker,
        reason: String,
    },
}

impl ExchangeEvent {
    /// Short name of the event, for log fields and filtering.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenAdded { .. } => "token_added",
            Self::TokenRemoved { .. } => "token_removed",
            Self::Deposited { .. } => "deposited",
            Self::Withdrawn { .. } => "withdrawn",
            Self::OrderRested { .. } => "order_rested",
            Self::TradeExecuted(_) => "trade_executed",
            Self::OrderRejected { .. } => "order_rejected",
        }
    }
}
