//! The exchange: registry, ledger, books and custody behind one
//! `&mut self` state machine.
//!
//! Every public operation either applies completely or returns an error
//! with nothing changed. Order validation runs before any book or ledger
//! mutation, and a rejected order is journaled as
//! [`ExchangeEvent::OrderRejected`].

use std::collections::HashMap;

use chrono::Utc;
use clobex_book::OrderBook;
use clobex_ledger::{Custody, Ledger, SupplyConservation, TokenRegistry};
use clobex_types::{
    AssetRef, BalanceEntry, ClobError, ExchangeConfig, ExchangeEvent, Order, OrderId, OrderSide,
    OrderType, Result, Ticker, Token, Trade, TraderId, constants::QTY_PRECISION,
};
use rust_decimal::Decimal;

use crate::matching::{self, Sweep, escrow_for, exact_notional};
use crate::outcome::{OrderOutcome, OrderStatus};

pub struct Exchange<C: Custody> {
    config: ExchangeConfig,
    registry: TokenRegistry,
    ledger: Ledger,
    supply: SupplyConservation,
    /// One book per registered ticker other than the quote.
    books: HashMap<Ticker, OrderBook>,
    /// Escrow frozen behind each resting order, decremented per fill.
    escrow: HashMap<OrderId, Decimal>,
    custody: C,
    events: Vec<ExchangeEvent>,
    /// Next order submission sequence (time priority).
    next_order_sequence: u64,
    /// Next fill sequence (trade ids).
    next_fill_sequence: u64,
}

impl<C: Custody> Exchange<C> {
    /// Create an exchange with an empty registry.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(config: ExchangeConfig, custody: C) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            admin = %config.admin,
            exchange_account = %config.exchange_account,
            quote = %config.quote_ticker,
            "Exchange created"
        );
        Ok(Self {
            registry: TokenRegistry::new(config.admin),
            config,
            ledger: Ledger::new(),
            supply: SupplyConservation::new(),
            books: HashMap::new(),
            escrow: HashMap::new(),
            custody,
            events: Vec::new(),
            next_order_sequence: 0,
            next_fill_sequence: 0,
        })
    }

    // =================================================================
    // Token registry
    // =================================================================

    /// Register `ticker` as tradable, backed by `asset_ref`.
    ///
    /// # Errors
    /// `AccessDenied`, `InvalidTicker` or `InvalidAddress`; see
    /// [`TokenRegistry::add_token`].
    pub fn add_token(
        &mut self,
        caller: TraderId,
        ticker: Ticker,
        asset_ref: AssetRef,
    ) -> Result<Token> {
        let token = self.registry.add_token(caller, ticker, asset_ref)?.clone();
        if token.ticker != self.config.quote_ticker {
            self.books
                .insert(token.ticker.clone(), OrderBook::new(token.ticker.clone()));
        }
        self.events.push(ExchangeEvent::TokenAdded {
            ticker: token.ticker.clone(),
            asset_ref: token.asset_ref,
        });
        Ok(token)
    }

    /// Unregister `ticker`. Its book is drained and the escrow behind every
    /// drained order returns to the owner's available balance. Ledger
    /// balances in the ticker stay where they are.
    ///
    /// # Errors
    /// `AccessDenied` or `InvalidTicker`; see [`TokenRegistry::delete_token`].
    pub fn delete_token(&mut self, caller: TraderId, ticker: &Ticker) -> Result<Token> {
        let token = self.registry.delete_token(caller, ticker)?;

        let drained = self
            .books
            .remove(ticker)
            .map(|mut book| book.drain_all())
            .unwrap_or_default();
        for order in &drained {
            self.release_escrow(order);
        }

        tracing::info!(ticker = %ticker, drained_orders = drained.len(), "Book drained");
        self.events.push(ExchangeEvent::TokenRemoved {
            ticker: ticker.clone(),
            drained_orders: drained.len(),
        });
        Ok(token)
    }

    fn release_escrow(&mut self, order: &Order) {
        let released = escrow_for(order, &self.config.quote_ticker).and_then(|(ticker, amount)| {
            self.escrow.entry(order.id).or_insert(amount);
            matching::release_escrow(
                &mut self.ledger,
                &mut self.escrow,
                order.id,
                order.trader,
                &ticker,
            )
        });
        if let Err(err) = released {
            tracing::error!(
                order = %order.id,
                trader = %order.trader,
                error = %err,
                "Escrow release failed"
            );
        }
    }

    // =================================================================
    // Deposit / withdraw
    // =================================================================

    /// Pull `amount` of `ticker` from the trader's external account into
    /// custody and credit it to the ledger.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount <= 0`
    /// - `InvalidTicker` if the ticker is not registered
    /// - `InvalidAddress` if `trader` is nil
    /// - `InsufficientExternalBalance` if the external balance is too low
    ///   or the transfer fails; the ledger is then unchanged
    pub fn deposit(&mut self, trader: TraderId, ticker: &Ticker, amount: Decimal) -> Result<()> {
        let asset = self.check_transfer_args(trader, ticker, amount)?;
        let exchange_account = self.config.exchange_account;

        let external = self.custody.balance_of(&asset, &trader);
        if external < amount {
            return Err(ClobError::InsufficientExternalBalance {
                ticker: ticker.clone(),
                needed: amount,
                available: external,
            });
        }
        if !self.custody.transfer_from(&asset, &trader, &exchange_account, amount) {
            tracing::warn!(
                trader = %trader,
                ticker = %ticker,
                amount = %amount,
                "Deposit transfer failed"
            );
            return Err(ClobError::InsufficientExternalBalance {
                ticker: ticker.clone(),
                needed: amount,
                available: self.custody.balance_of(&asset, &trader),
            });
        }

        self.ledger.credit(trader, ticker, amount);
        self.supply.record_deposit(ticker, amount);
        tracing::info!(trader = %trader, ticker = %ticker, amount = %amount, "Deposit credited");
        self.events.push(ExchangeEvent::Deposited {
            trader,
            ticker: ticker.clone(),
            amount,
        });
        Ok(())
    }

    /// Debit `amount` of `ticker` from the ledger and push it from custody
    /// to the trader's external account. A failed transfer restores the
    /// debit.
    ///
    /// # Errors
    /// - `InvalidAmount`, `InvalidTicker`, `InvalidAddress` as for deposit
    /// - `InsufficientBalance` if available < amount
    /// - `InsufficientExternalBalance` if the custody transfer fails
    pub fn withdraw(&mut self, trader: TraderId, ticker: &Ticker, amount: Decimal) -> Result<()> {
        let asset = self.check_transfer_args(trader, ticker, amount)?;
        let exchange_account = self.config.exchange_account;

        self.ledger.debit(trader, ticker, amount)?;
        if !self.custody.transfer(&asset, &exchange_account, &trader, amount) {
            self.ledger.credit(trader, ticker, amount);
            tracing::warn!(
                trader = %trader,
                ticker = %ticker,
                amount = %amount,
                "Withdraw transfer failed, debit rolled back"
            );
            return Err(ClobError::InsufficientExternalBalance {
                ticker: ticker.clone(),
                needed: amount,
                available: self.custody.balance_of(&asset, &exchange_account),
            });
        }

        self.supply.record_withdrawal(ticker, amount);
        tracing::info!(trader = %trader, ticker = %ticker, amount = %amount, "Withdrawal sent");
        self.events.push(ExchangeEvent::Withdrawn {
            trader,
            ticker: ticker.clone(),
            amount,
        });
        Ok(())
    }

    fn check_transfer_args(
        &self,
        trader: TraderId,
        ticker: &Ticker,
        amount: Decimal,
    ) -> Result<AssetRef> {
        if amount <= Decimal::ZERO {
            return Err(ClobError::InvalidAmount(amount));
        }
        let asset = self.registry.require(ticker)?.asset_ref;
        if trader.is_nil() {
            return Err(ClobError::invalid_address("trader is null"));
        }
        Ok(asset)
    }

    // =================================================================
    // Orders
    // =================================================================

    /// Submit a limit order. It crosses the opposite side first, settling
    /// every fill at the maker's price; any remainder rests in the book with
    /// its escrow frozen.
    ///
    /// Prices and amounts carry at most `QTY_PRECISION` decimal places, and
    /// `price × amount` must be exactly representable.
    ///
    /// # Errors
    /// `InvalidAddress`, `InvalidTicker`, `InvalidAmount`, `InvalidPrice` or
    /// `InsufficientBalance` on validation failure; nothing changes then.
    pub fn limit_order(
        &mut self,
        trader: TraderId,
        ticker: &Ticker,
        side: OrderSide,
        price: Decimal,
        amount: Decimal,
    ) -> Result<OrderOutcome> {
        if let Err(err) = self.validate_order(trader, ticker, side, Some(price), amount) {
            return Err(self.reject(trader, ticker, err));
        }

        let mut order = self.new_order(trader, ticker, side, OrderType::Limit, Some(price), amount);
        let trades = match self.sweep(&mut order) {
            Ok(trades) => trades,
            Err(err) => return Err(self.reject(trader, ticker, err)),
        };

        let status = if order.is_filled() {
            OrderStatus::Filled
        } else {
            self.rest(order.clone())?;
            OrderStatus::Resting
        };
        Ok(self.finish(order, trades, status))
    }

    /// Submit a market order: an immediate-or-cancel sweep of the opposite
    /// side. A BUY takes only what its quote balance pays for; whatever is
    /// left when the sweep stops is discarded, never rested.
    ///
    /// # Errors
    /// `InvalidAddress`, `InvalidTicker`, `InvalidAmount`, or (SELL)
    /// `InsufficientBalance` on validation failure. Running out of
    /// liquidity or quote balance is not an error.
    pub fn market_order(
        &mut self,
        trader: TraderId,
        ticker: &Ticker,
        side: OrderSide,
        amount: Decimal,
    ) -> Result<OrderOutcome> {
        if let Err(err) = self.validate_order(trader, ticker, side, None, amount) {
            return Err(self.reject(trader, ticker, err));
        }

        let mut order = self.new_order(trader, ticker, side, OrderType::Market, None, amount);
        let trades = match self.sweep(&mut order) {
            Ok(trades) => trades,
            Err(err) => return Err(self.reject(trader, ticker, err)),
        };

        let status = if order.is_filled() {
            OrderStatus::Filled
        } else if trades.is_empty() {
            OrderStatus::Expired
        } else {
            OrderStatus::PartiallyFilled
        };
        if status != OrderStatus::Filled {
            tracing::info!(
                order = %order.id,
                trader = %trader,
                ticker = %ticker,
                filled = %order.filled,
                discarded = %order.remaining(),
                "Market order remainder discarded"
            );
        }
        Ok(self.finish(order, trades, status))
    }

    fn validate_order(
        &self,
        trader: TraderId,
        ticker: &Ticker,
        side: OrderSide,
        price: Option<Decimal>,
        amount: Decimal,
    ) -> Result<()> {
        if trader.is_nil() {
            return Err(ClobError::invalid_address("trader is null"));
        }
        self.registry.require(ticker)?;
        let quote = &self.config.quote_ticker;
        if ticker == quote {
            return Err(ClobError::invalid_ticker(ticker, "cannot trade the quote asset"));
        }
        if !self.registry.is_registered(quote) {
            return Err(ClobError::invalid_ticker(quote, "quote asset is not registered"));
        }
        if amount <= Decimal::ZERO || amount.normalize().scale() > QTY_PRECISION {
            return Err(ClobError::InvalidAmount(amount));
        }
        if let Some(price) =
            price.filter(|p| *p <= Decimal::ZERO || p.normalize().scale() > QTY_PRECISION)
        {
            return Err(ClobError::InvalidPrice(price));
        }
        let notional = match price {
            Some(price) => {
                Some(exact_notional(price, amount).ok_or(ClobError::InvalidAmount(amount))?)
            }
            None => None,
        };

        let (pays, needed) = match (side, notional) {
            (OrderSide::Buy, Some(notional)) => (quote, notional),
            // Market BUY is bounded by its balance during the sweep.
            (OrderSide::Buy, None) => return Ok(()),
            (OrderSide::Sell, _) => (ticker, amount),
        };
        let available = self.ledger.available(trader, pays);
        if available < needed {
            return Err(ClobError::InsufficientBalance {
                ticker: pays.clone(),
                needed,
                available,
            });
        }
        Ok(())
    }

    fn reject(&mut self, trader: TraderId, ticker: &Ticker, err: ClobError) -> ClobError {
        tracing::warn!(
            trader = %trader,
            ticker = %ticker,
            kind = err.kind(),
            error = %err,
            "Order rejected"
        );
        self.events.push(ExchangeEvent::OrderRejected {
            trader,
            ticker: ticker.clone(),
            reason: err.to_string(),
        });
        err
    }

    fn new_order(
        &mut self,
        trader: TraderId,
        ticker: &Ticker,
        side: OrderSide,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: Decimal,
    ) -> Order {
        let sequence = self.next_order_sequence;
        self.next_order_sequence += 1;
        Order {
            id: OrderId::new(),
            trader,
            ticker: ticker.clone(),
            side,
            order_type,
            price,
            quantity,
            filled: Decimal::ZERO,
            sequence,
            created_at: Utc::now(),
        }
    }

    fn sweep(&mut self, order: &mut Order) -> Result<Vec<Trade>> {
        let book = self.books.get_mut(&order.ticker).ok_or_else(|| {
            ClobError::Internal(format!("registered ticker {} has no book", order.ticker))
        })?;
        Sweep {
            book,
            ledger: &mut self.ledger,
            escrow: &mut self.escrow,
            quote: &self.config.quote_ticker,
            fill_sequence: &mut self.next_fill_sequence,
        }
        .run(order)
    }

    /// Freeze the remainder's escrow and insert it into the book.
    fn rest(&mut self, order: Order) -> Result<()> {
        let (escrow_ticker, escrow) = escrow_for(&order, &self.config.quote_ticker)?;
        self.ledger.freeze(order.trader, &escrow_ticker, escrow)?;

        let book = self.books.get_mut(&order.ticker).ok_or_else(|| {
            ClobError::Internal(format!("registered ticker {} has no book", order.ticker))
        })?;
        let event = ExchangeEvent::OrderRested {
            order_id: order.id,
            trader: order.trader,
            ticker: order.ticker.clone(),
            side: order.side,
            price: order.price.unwrap_or_default(),
            remaining: order.remaining(),
        };
        let (trader, id) = (order.trader, order.id);
        if let Err(err) = book.insert_sorted(order) {
            self.ledger.unfreeze(trader, &escrow_ticker, escrow)?;
            return Err(err);
        }
        self.escrow.insert(id, escrow);

        tracing::info!(
            order = %id,
            trader = %trader,
            escrow = %escrow,
            escrow_ticker = %escrow_ticker,
            "Order resting"
        );
        self.events.push(event);
        Ok(())
    }

    fn finish(&mut self, order: Order, trades: Vec<Trade>, status: OrderStatus) -> OrderOutcome {
        self.events
            .extend(trades.iter().cloned().map(ExchangeEvent::TradeExecuted));
        tracing::debug!(
            order = %order.id,
            status = ?status,
            fills = trades.len(),
            filled = %order.filled,
            "Order processed"
        );
        OrderOutcome {
            order,
            trades,
            status,
        }
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    #[must_use]
    pub fn list_tickers(&self) -> &[Ticker] {
        self.registry.list_tickers()
    }

    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        self.registry.tokens()
    }

    #[must_use]
    pub fn describe(&self, ticker: &Ticker) -> Option<&Token> {
        self.registry.describe(ticker)
    }

    /// Total ledger balance (available + frozen); zero if unknown.
    #[must_use]
    pub fn get_balance(&self, trader: TraderId, ticker: &Ticker) -> Decimal {
        self.ledger.get_balance(trader, ticker)
    }

    #[must_use]
    pub fn balance(&self, trader: TraderId, ticker: &Ticker) -> BalanceEntry {
        self.ledger.balance(trader, ticker)
    }

    /// Sum of every trader's ledger balance in `ticker`.
    #[must_use]
    pub fn total_supply(&self, ticker: &Ticker) -> Decimal {
        self.ledger.total_supply(ticker)
    }

    /// Resting orders of one side in priority order; empty for unknown
    /// tickers.
    #[must_use]
    pub fn get_orders(&self, ticker: &Ticker, side: OrderSide) -> Vec<Order> {
        self.books
            .get(ticker)
            .map(|book| book.orders(side))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn best_bid(&self, ticker: &Ticker) -> Option<&Order> {
        self.books.get(ticker)?.best_bid()
    }

    #[must_use]
    pub fn best_ask(&self, ticker: &Ticker) -> Option<&Order> {
        self.books.get(ticker)?.best_ask()
    }

    /// Aggregated `(price, quantity)` levels, best first.
    #[must_use]
    pub fn depth(
        &self,
        ticker: &Ticker,
        side: OrderSide,
        max_levels: usize,
    ) -> Vec<(Decimal, Decimal)> {
        self.books
            .get(ticker)
            .map(|book| book.depth(side, max_levels))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn order_book(&self, ticker: &Ticker) -> Option<&OrderBook> {
        self.books.get(ticker)
    }

    #[must_use]
    pub fn events(&self) -> &[ExchangeEvent] {
        &self.events
    }

    /// Take the journal, leaving it empty.
    pub fn drain_events(&mut self) -> Vec<ExchangeEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    /// Ledger total of `ticker` must equal deposits minus withdrawals and
    /// must not exceed what custody holds for the exchange. No ledger entry
    /// may be negative.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on mismatch.
    pub fn verify_supply(&self, ticker: &Ticker) -> Result<()> {
        if self.ledger.has_negative_balance() {
            tracing::error!(ticker = %ticker, "Negative ledger balance");
            return Err(ClobError::SupplyInvariantViolation {
                reason: "negative ledger balance".into(),
            });
        }
        let ledger_total = self.ledger.total_supply(ticker);
        self.supply.verify(ticker, ledger_total)?;
        if let Some(token) = self.registry.describe(ticker) {
            let custodied = self
                .custody
                .balance_of(&token.asset_ref, &self.config.exchange_account);
            if ledger_total > custodied {
                tracing::error!(
                    ticker = %ticker,
                    ledger = %ledger_total,
                    custodied = %custodied,
                    "Ledger exceeds custody"
                );
                return Err(ClobError::SupplyInvariantViolation {
                    reason: format!(
                        "{ticker}: ledger {ledger_total} exceeds custodied {custodied}"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Check ordering, fill bounds and non-crossing of every book.
    ///
    /// # Errors
    /// Returns `BookInvariantViolation` for the first bad book.
    pub fn check_book_invariants(&self) -> Result<()> {
        self.books.values().try_for_each(OrderBook::check_invariants)
    }
}
