//! Supply conservation invariant checker.
//!
//! ```text
//! ∀ ticker: Σ ledger(available + frozen) == Σ deposits − Σ withdrawals
//! ```
//!
//! Trade settlement only moves balances between traders, so it never
//! changes either side of the equation.

use std::collections::{BTreeSet, HashMap};

use clobex_types::{ClobError, Result, Ticker};
use rust_decimal::Decimal;

/// Per-ticker deposit and withdrawal totals since genesis.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    deposits: HashMap<Ticker, Decimal>,
    withdrawals: HashMap<Ticker, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, ticker: &Ticker, amount: Decimal) {
        *self.deposits.entry(ticker.clone()).or_insert(Decimal::ZERO) += amount;
    }

    pub fn record_withdrawal(&mut self, ticker: &Ticker, amount: Decimal) {
        *self.withdrawals.entry(ticker.clone()).or_insert(Decimal::ZERO) += amount;
    }

    #[must_use]
    pub fn total_deposits(&self, ticker: &Ticker) -> Decimal {
        self.deposits.get(ticker).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn total_withdrawals(&self, ticker: &Ticker) -> Decimal {
        self.withdrawals.get(ticker).copied().unwrap_or(Decimal::ZERO)
    }

    /// Expected ledger total for a ticker: deposits − withdrawals.
    #[must_use]
    pub fn expected_supply(&self, ticker: &Ticker) -> Decimal {
        self.total_deposits(ticker) - self.total_withdrawals(ticker)
    }

    /// Verify that the ledger total matches the net custodied amount.
    ///
    /// # Errors
    /// Returns [`ClobError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, ticker: &Ticker, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(ticker);
        if actual_supply != expected {
            tracing::error!(
                ticker = %ticker,
                actual = %actual_supply,
                expected = %expected,
                "Supply invariant violated"
            );
            return Err(ClobError::SupplyInvariantViolation {
                reason: format!(
                    "{ticker}: ledger supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(ticker),
                    self.total_withdrawals(ticker),
                ),
            });
        }
        Ok(())
    }

    /// Every ticker that ever saw a deposit or withdrawal, sorted.
    #[must_use]
    pub fn tracked_tickers(&self) -> Vec<Ticker> {
        let tickers: BTreeSet<&Ticker> =
            self.deposits.keys().chain(self.withdrawals.keys()).collect();
        tickers.into_iter().cloned().collect()
    }
}
