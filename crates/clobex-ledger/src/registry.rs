//! Admin-curated registry of tradable tokens.
//!
//! Maps each ticker to the external asset it stands for. A ticker is
//! tradable exactly while it is registered. Registration order is kept in
//! a compact active list: deleting a ticker removes its slot, it never
//! leaves a placeholder behind for later scans to skip.

use std::collections::HashMap;

use clobex_types::{AssetRef, ClobError, Result, Ticker, Token, TraderId};

pub struct TokenRegistry {
    /// The only identity allowed to mutate the registry.
    admin: TraderId,
    tokens: HashMap<Ticker, Token>,
    /// Reverse binding so one asset backs at most one ticker.
    by_asset: HashMap<AssetRef, Ticker>,
    /// Registered tickers in registration order.
    active: Vec<Ticker>,
}

impl TokenRegistry {
    #[must_use]
    pub fn new(admin: TraderId) -> Self {
        Self {
            admin,
            tokens: HashMap::new(),
            by_asset: HashMap::new(),
            active: Vec::new(),
        }
    }

    fn require_admin(&self, caller: TraderId) -> Result<()> {
        if caller != self.admin {
            return Err(ClobError::AccessDenied { caller });
        }
        Ok(())
    }

    /// Register `ticker` as backed by `asset_ref`.
    ///
    /// # Errors
    /// - `AccessDenied` if `caller` is not the admin
    /// - `InvalidTicker` if the ticker is empty, too long, or already registered
    /// - `InvalidAddress` if `asset_ref` is zero or already bound to another ticker
    pub fn add_token(
        &mut self,
        caller: TraderId,
        ticker: Ticker,
        asset_ref: AssetRef,
    ) -> Result<&Token> {
        self.require_admin(caller)?;

        if ticker.is_empty() {
            return Err(ClobError::invalid_ticker(&ticker, "ticker is empty"));
        }
        if !ticker.is_well_formed() {
            return Err(ClobError::invalid_ticker(&ticker, "ticker is too long"));
        }
        if self.tokens.contains_key(&ticker) {
            return Err(ClobError::invalid_ticker(&ticker, "already exists"));
        }
        if asset_ref.is_zero() {
            return Err(ClobError::invalid_address("asset reference is zero"));
        }
        if let Some(bound) = self.by_asset.get(&asset_ref) {
            return Err(ClobError::invalid_address(format!(
                "asset {asset_ref} already bound to {bound}"
            )));
        }

        self.by_asset.insert(asset_ref, ticker.clone());
        self.active.push(ticker.clone());
        tracing::info!(ticker = %ticker, asset = %asset_ref, "Token added");
        Ok(self
            .tokens
            .entry(ticker.clone())
            .or_insert(Token::new(ticker, asset_ref)))
    }

    /// Unregister `ticker`, compacting the active list.
    ///
    /// # Errors
    /// - `AccessDenied` if `caller` is not the admin
    /// - `InvalidTicker` if the ticker is empty or unknown
    pub fn delete_token(&mut self, caller: TraderId, ticker: &Ticker) -> Result<Token> {
        self.require_admin(caller)?;

        if ticker.is_empty() {
            return Err(ClobError::invalid_ticker(ticker, "ticker is empty"));
        }
        let token = self
            .tokens
            .remove(ticker)
            .ok_or_else(|| ClobError::invalid_ticker(ticker, "unknown ticker"))?;
        self.by_asset.remove(&token.asset_ref);
        self.active.retain(|t| t != ticker);

        tracing::info!(ticker = %ticker, asset = %token.asset_ref, "Token deleted");
        Ok(token)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Registered tickers in registration order.
    #[must_use]
    pub fn list_tickers(&self) -> &[Ticker] {
        &self.active
    }

    #[must_use]
    pub fn describe(&self, ticker: &Ticker) -> Option<&Token> {
        self.tokens.get(ticker)
    }

    /// All registered tokens in registration order.
    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        self.active
            .iter()
            .filter_map(|t| self.tokens.get(t).cloned())
            .collect()
    }

    #[must_use]
    pub fn is_registered(&self, ticker: &Ticker) -> bool {
        self.tokens.contains_key(ticker)
    }

    /// The registered token for `ticker`, or `InvalidTicker`.
    pub fn require(&self, ticker: &Ticker) -> Result<&Token> {
        if ticker.is_empty() {
            return Err(ClobError::invalid_ticker(ticker, "ticker is empty"));
        }
        self.tokens
            .get(ticker)
            .ok_or_else(|| ClobError::invalid_ticker(ticker, "unknown ticker"))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
