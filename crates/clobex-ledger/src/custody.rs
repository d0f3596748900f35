//! The external custodial asset interface.
//!
//! The exchange never moves external assets itself: deposit and withdraw
//! are thin orchestration over a [`Custody`] implementation supplied by
//! the host. Transfers report success as a `bool`; the exchange treats any
//! `false` as a failed transfer and leaves its ledger untouched.

use std::collections::HashMap;

use clobex_types::{AssetRef, TraderId};
use rust_decimal::Decimal;

pub trait Custody {
    /// External balance of `account` in `asset`.
    fn balance_of(&self, asset: &AssetRef, account: &TraderId) -> Decimal;

    /// Pull `amount` from `from` into `to` (deposit direction).
    fn transfer_from(
        &mut self,
        asset: &AssetRef,
        from: &TraderId,
        to: &TraderId,
        amount: Decimal,
    ) -> bool;

    /// Push `amount` from the exchange account `from` to `to` (withdraw
    /// direction).
    fn transfer(
        &mut self,
        asset: &AssetRef,
        from: &TraderId,
        to: &TraderId,
        amount: Decimal,
    ) -> bool;
}

/// In-memory custody for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    balances: HashMap<(AssetRef, TraderId), Decimal>,
    /// When set, every transfer fails without moving anything.
    fail_transfers: bool,
}

impl InMemoryCustody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create external balance out of thin air.
    pub fn mint(&mut self, asset: AssetRef, account: TraderId, amount: Decimal) {
        *self.balances.entry((asset, account)).or_insert(Decimal::ZERO) += amount;
    }

    pub fn set_fail_transfers(&mut self, fail: bool) {
        self.fail_transfers = fail;
    }

    fn move_funds(
        &mut self,
        asset: &AssetRef,
        from: &TraderId,
        to: &TraderId,
        amount: Decimal,
    ) -> bool {
        if self.fail_transfers || amount <= Decimal::ZERO {
            return false;
        }
        let Some(src) = self.balances.get_mut(&(*asset, *from)) else {
            return false;
        };
        if *src < amount {
            return false;
        }
        *src -= amount;
        *self.balances.entry((*asset, *to)).or_insert(Decimal::ZERO) += amount;
        true
    }
}

impl Custody for InMemoryCustody {
    fn balance_of(&self, asset: &AssetRef, account: &TraderId) -> Decimal {
        self.balances
            .get(&(*asset, *account))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn transfer_from(
        &mut self,
        asset: &AssetRef,
        from: &TraderId,
        to: &TraderId,
        amount: Decimal,
    ) -> bool {
        self.move_funds(asset, from, to, amount)
    }

    fn transfer(
        &mut self,
        asset: &AssetRef,
        from: &TraderId,
        to: &TraderId,
        amount: Decimal,
    ) -> bool {
        self.move_funds(asset, from, to, amount)
    }
}
