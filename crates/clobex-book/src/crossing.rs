//! Crossing predicate: does an incoming order accept a resting price?

use clobex_types::OrderSide;
use rust_decimal::Decimal;

/// Whether a taker on `taker_side` with limit `limit` (`None` for market)
/// trades against a maker resting at `maker_price`.
///
/// A BUY crosses when the ask is at or below its limit; a SELL crosses
/// when the bid is at or above its limit. Market orders cross any price.
#[must_use]
pub fn crosses(taker_side: OrderSide, limit: Option<Decimal>, maker_price: Decimal) -> bool {
    match (taker_side, limit) {
        (_, None) => true,
        (OrderSide::Buy, Some(limit)) => maker_price <= limit,
        (OrderSide::Sell, Some(limit)) => maker_price >= limit,
    }
}
