//! Per-trader, per-ticker custodial balances.
//!
//! Balances change only through deposit/withdraw (credit/debit) and trade
//! settlement (freeze and the two transfer primitives). Every mutation
//! checks before it writes: either the whole operation applies or the
//! ledger is unchanged. Entries are created lazily and never deleted.

use std::collections::HashMap;

use clobex_types::{BalanceEntry, ClobError, Result, Ticker, TraderId};
use rust_decimal::Decimal;

#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<(TraderId, Ticker), BalanceEntry>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    fn insufficient(ticker: &Ticker, needed: Decimal, available: Decimal) -> ClobError {
        ClobError::InsufficientBalance {
            ticker: ticker.clone(),
            needed,
            available,
        }
    }

    /// Increase available balance.
    pub fn credit(&mut self, trader: TraderId, ticker: &Ticker, amount: Decimal) {
        let entry = self.balances.entry((trader, ticker.clone())).or_default();
        entry.available += amount;
    }

    /// Decrease available balance.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if available < amount.
    pub fn debit(&mut self, trader: TraderId, ticker: &Ticker, amount: Decimal) -> Result<()> {
        let available = self.available(trader, ticker);
        if available < amount {
            return Err(Self::insufficient(ticker, amount, available));
        }
        if let Some(entry) = self.balances.get_mut(&(trader, ticker.clone())) {
            entry.available -= amount;
        }
        Ok(())
    }

    /// Escrow funds behind a resting order (available → frozen).
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if available < amount.
    pub fn freeze(&mut self, trader: TraderId, ticker: &Ticker, amount: Decimal) -> Result<()> {
        let available = self.available(trader, ticker);
        if available < amount {
            return Err(Self::insufficient(ticker, amount, available));
        }
        if let Some(entry) = self.balances.get_mut(&(trader, ticker.clone())) {
            entry.available -= amount;
            entry.frozen += amount;
        }
        Ok(())
    }

    /// Release escrow (frozen → available).
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if frozen < amount.
    pub fn unfreeze(&mut self, trader: TraderId, ticker: &Ticker, amount: Decimal) -> Result<()> {
        let frozen = self.balance(trader, ticker).frozen;
        if frozen < amount {
            return Err(Self::insufficient(ticker, amount, frozen));
        }
        if let Some(entry) = self.balances.get_mut(&(trader, ticker.clone())) {
            entry.frozen -= amount;
            entry.available += amount;
        }
        Ok(())
    }

    /// Move `amount` from `from`'s available balance to `to`'s available
    /// balance. Used for the taker's leg of a fill.
    pub fn transfer_available(
        &mut self,
        from: TraderId,
        to: TraderId,
        ticker: &Ticker,
        amount: Decimal,
    ) -> Result<()> {
        self.debit(from, ticker, amount)?;
        self.credit(to, ticker, amount);
        Ok(())
    }

    /// Move `amount` from `from`'s frozen balance to `to`'s available
    /// balance. Used for the maker's leg of a fill.
    pub fn transfer_frozen(
        &mut self,
        from: TraderId,
        to: TraderId,
        ticker: &Ticker,
        amount: Decimal,
    ) -> Result<()> {
        let frozen = self.balance(from, ticker).frozen;
        if frozen < amount {
            return Err(Self::insufficient(ticker, amount, frozen));
        }
        if let Some(entry) = self.balances.get_mut(&(from, ticker.clone())) {
            entry.frozen -= amount;
        }
        self.credit(to, ticker, amount);
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Full balance entry; zero for unknown pairs.
    #[must_use]
    pub fn balance(&self, trader: TraderId, ticker: &Ticker) -> BalanceEntry {
        self.balances
            .get(&(trader, ticker.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Total balance (available + frozen); zero for unknown pairs.
    #[must_use]
    pub fn get_balance(&self, trader: TraderId, ticker: &Ticker) -> Decimal {
        self.balance(trader, ticker).total()
    }

    #[must_use]
    pub fn available(&self, trader: TraderId, ticker: &Ticker) -> Decimal {
        self.balance(trader, ticker).available
    }

    /// Sum of every trader's total balance in `ticker`.
    #[must_use]
    pub fn total_supply(&self, ticker: &Ticker) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, t), _)| t == ticker)
            .map(|(_, entry)| entry.total())
            .sum()
    }

    /// Whether any balance anywhere went negative.
    #[must_use]
    pub fn has_negative_balance(&self) -> bool {
        self.balances
            .values()
            .any(|e| e.available < Decimal::ZERO || e.frozen < Decimal::ZERO)
    }
}
