//! The crossing loop and per-fill settlement.
//!
//! A sweep runs in two phases:
//!
//! ```text
//! plan:  walk the opposite side best-first (read only)
//!        consumed = min(taker.remaining, maker.remaining[, affordable])
//!        check taker budget and maker escrow for every fill
//! apply: settle each planned fill at the maker's price
//!        taker.filled += consumed; maker.filled += consumed
//!        maker exhausted -> remove exactly that order, release its escrow
//! ```
//!
//! Every rejection happens in `plan`, so a sweep that fails leaves the book
//! and the ledger untouched. Settlement only moves balances already held in
//! the ledger: the maker pays out of the escrow frozen when it rested, the
//! taker pays out of its available balance.

use std::collections::HashMap;

use chrono::Utc;
use clobex_book::{OrderBook, crosses};
use clobex_ledger::Ledger;
use clobex_types::{
    ClobError, Order, OrderId, OrderSide, OrderType, Result, Ticker, Trade, TradeId, TraderId,
    constants::QTY_PRECISION,
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Mutable state one sweep needs, borrowed out of the exchange.
pub(crate) struct Sweep<'a> {
    pub book: &'a mut OrderBook,
    pub ledger: &'a mut Ledger,
    /// Escrow still held behind each resting order.
    pub escrow: &'a mut HashMap<OrderId, Decimal>,
    pub quote: &'a Ticker,
    pub fill_sequence: &'a mut u64,
}

/// One fill decided by the plan phase.
#[derive(Debug)]
struct Fill {
    maker_id: OrderId,
    maker_trader: TraderId,
    price: Decimal,
    quantity: Decimal,
    quote_amount: Decimal,
    exhausts_maker: bool,
}

impl Sweep<'_> {
    /// Match `taker` against the opposite side of the book until it is
    /// filled, the side is exhausted, nothing crosses anymore, or (market
    /// BUY) the taker's quote balance runs out.
    ///
    /// # Errors
    /// Returns the plan's error with nothing changed.
    pub fn run(&mut self, taker: &mut Order) -> Result<Vec<Trade>> {
        let fills = self.plan(taker)?;
        self.apply(taker, fills)
    }

    /// `(ticker the taker pays in, ticker the maker pays in)`.
    fn legs(&self, taker: &Order) -> (Ticker, Ticker) {
        match taker.side {
            OrderSide::Buy => (self.quote.clone(), taker.ticker.clone()),
            OrderSide::Sell => (taker.ticker.clone(), self.quote.clone()),
        }
    }

    fn plan(&self, taker: &Order) -> Result<Vec<Fill>> {
        let (taker_pays, maker_pays) = self.legs(taker);
        let market_buy = taker.order_type == OrderType::Market && taker.side == OrderSide::Buy;
        let mut budget = self.ledger.available(taker.trader, &taker_pays);
        let mut maker_frozen: HashMap<TraderId, Decimal> = HashMap::new();
        let mut remaining = taker.remaining();
        let mut fills = Vec::new();

        'levels: for level in self.book.levels(taker.side.opposite()) {
            if !crosses(taker.side, taker.price, level.price) {
                break;
            }
            for maker in &level.orders {
                let mut quantity = remaining.min(maker.remaining());
                if market_buy {
                    quantity = quantity.min(affordable_quantity(budget, level.price));
                }
                if quantity <= Decimal::ZERO {
                    tracing::debug!(
                        order = %taker.id,
                        trader = %taker.trader,
                        budget = %budget,
                        "Quote balance exhausted, ending sweep"
                    );
                    break 'levels;
                }

                let quote_amount = exact_notional(level.price, quantity).ok_or_else(|| {
                    ClobError::Internal(format!("notional {} x {quantity} not exact", level.price))
                })?;
                let (taker_amount, maker_amount) = match taker.side {
                    OrderSide::Buy => (quote_amount, quantity),
                    OrderSide::Sell => (quantity, quote_amount),
                };

                if budget < taker_amount {
                    return Err(ClobError::InsufficientBalance {
                        ticker: taker_pays,
                        needed: taker_amount,
                        available: budget,
                    });
                }
                let held = self.escrow.get(&maker.id).copied().unwrap_or_default();
                let frozen = maker_frozen
                    .entry(maker.trader)
                    .or_insert_with(|| self.ledger.balance(maker.trader, &maker_pays).frozen);
                if held < maker_amount || *frozen < maker_amount {
                    tracing::error!(
                        order = %maker.id,
                        trader = %maker.trader,
                        held = %held,
                        frozen = %frozen,
                        needed = %maker_amount,
                        "Resting order escrow short"
                    );
                    return Err(ClobError::Internal(format!(
                        "escrow of order {} holds {held} {maker_pays}, fill needs {maker_amount}",
                        maker.id
                    )));
                }

                *frozen -= maker_amount;
                budget -= taker_amount;
                remaining -= quantity;
                fills.push(Fill {
                    maker_id: maker.id,
                    maker_trader: maker.trader,
                    price: level.price,
                    quantity,
                    quote_amount,
                    exhausts_maker: quantity == maker.remaining(),
                });
                if remaining.is_zero() {
                    break 'levels;
                }
            }
        }

        Ok(fills)
    }

    /// Settle planned fills. The plan already checked every balance these
    /// transfers need, and each planned maker is still resting.
    fn apply(&mut self, taker: &mut Order, fills: Vec<Fill>) -> Result<Vec<Trade>> {
        let (taker_pays, maker_pays) = self.legs(taker);
        let maker_side = taker.side.opposite();
        let mut trades = Vec::with_capacity(fills.len());

        for fill in fills {
            let (taker_amount, maker_amount) = match taker.side {
                OrderSide::Buy => (fill.quote_amount, fill.quantity),
                OrderSide::Sell => (fill.quantity, fill.quote_amount),
            };
            let maker = self
                .book
                .get_mut(&fill.maker_id)
                .ok_or(ClobError::OrderNotFound(fill.maker_id))?;
            maker.record_fill(fill.quantity);
            taker.record_fill(fill.quantity);

            self.ledger
                .transfer_available(taker.trader, fill.maker_trader, &taker_pays, taker_amount)?;
            self.ledger
                .transfer_frozen(fill.maker_trader, taker.trader, &maker_pays, maker_amount)?;
            if let Some(held) = self.escrow.get_mut(&fill.maker_id) {
                *held -= maker_amount;
            }

            let (buyer, seller) = match taker.side {
                OrderSide::Buy => (taker.trader, fill.maker_trader),
                OrderSide::Sell => (fill.maker_trader, taker.trader),
            };
            let sequence = *self.fill_sequence;
            *self.fill_sequence += 1;
            tracing::debug!(
                trade = sequence,
                ticker = %taker.ticker,
                buyer = %buyer,
                seller = %seller,
                price = %fill.price,
                qty = %fill.quantity,
                "Trade matched"
            );

            if fill.exhausts_maker {
                self.book.remove_filled(maker_side, &fill.maker_id)?;
                release_escrow(
                    self.ledger,
                    self.escrow,
                    fill.maker_id,
                    fill.maker_trader,
                    &maker_pays,
                )?;
            }

            trades.push(Trade {
                id: TradeId::deterministic(sequence),
                ticker: taker.ticker.clone(),
                taker_order_id: taker.id,
                maker_order_id: fill.maker_id,
                buyer,
                seller,
                price: fill.price,
                quantity: fill.quantity,
                quote_amount: fill.quote_amount,
                taker_side: taker.side,
                sequence,
                executed_at: Utc::now(),
            });
        }

        Ok(trades)
    }
}

/// `price × quantity` without rounding. `None` if either operand has more
/// than `QTY_PRECISION` significant decimal places, or if the product at
/// `price.scale() + QTY_PRECISION` places does not fit a `Decimal`.
///
/// When this holds for `(price, quantity)` it also holds for every smaller
/// quantity with at most `QTY_PRECISION` places, so a resting order's
/// escrow splits into exact per-fill amounts.
pub(crate) fn exact_notional(price: Decimal, quantity: Decimal) -> Option<Decimal> {
    let (price, quantity) = (price.normalize(), quantity.normalize());
    if price.scale() > QTY_PRECISION || quantity.scale() > QTY_PRECISION {
        return None;
    }
    let quantity_units = quantity
        .mantissa()
        .checked_mul(10_i128.pow(QTY_PRECISION - quantity.scale()))?;
    let units = price.mantissa().checked_mul(quantity_units)?;
    Decimal::try_from_i128_with_scale(units, price.scale() + QTY_PRECISION)
        .ok()
        .map(|d| d.normalize())
}

/// Largest quantity `quote_available` pays for at `price`, rounded down to
/// the quantity precision.
pub(crate) fn affordable_quantity(quote_available: Decimal, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO || quote_available <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    quote_available
        .checked_div(price)
        .unwrap_or(Decimal::MAX)
        .round_dp_with_strategy(QTY_PRECISION, RoundingStrategy::ToZero)
}

/// Escrow a resting order needs: `(ticker, amount)`.
pub(crate) fn escrow_for(order: &Order, quote: &Ticker) -> Result<(Ticker, Decimal)> {
    match order.side {
        OrderSide::Sell => Ok((order.ticker.clone(), order.remaining())),
        OrderSide::Buy => {
            let price = order.price.ok_or_else(|| ClobError::InvalidOrder {
                reason: "resting BUY without a price".into(),
            })?;
            let amount = exact_notional(price, order.remaining())
                .ok_or(ClobError::InvalidAmount(order.remaining()))?;
            Ok((quote.clone(), amount))
        }
    }
}

/// Return whatever escrow `order_id` still holds to its owner's available
/// balance and forget the order.
pub(crate) fn release_escrow(
    ledger: &mut Ledger,
    escrow: &mut HashMap<OrderId, Decimal>,
    order_id: OrderId,
    trader: TraderId,
    ticker: &Ticker,
) -> Result<()> {
    let leftover = escrow.remove(&order_id).unwrap_or_default();
    if leftover > Decimal::ZERO {
        ledger.unfreeze(trader, ticker, leftover)?;
        tracing::debug!(
            order = %order_id,
            trader = %trader,
            leftover = %leftover,
            "Escrow released"
        );
    }
    Ok(())
}
