//! Configuration for an exchange instance.

use serde::{Deserialize, Serialize};

use crate::{ClobError, Result, Ticker, TraderId, constants};

/// Construction-time configuration of an exchange.
///
/// The admin identity is injected here rather than living in global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// The only identity allowed to add or delete tokens.
    pub admin: TraderId,
    /// Custodial account that holds deposited assets.
    pub exchange_account: TraderId,
    /// Ticker every other instrument is priced in.
    #[serde(default = "default_quote_ticker")]
    pub quote_ticker: Ticker,
}

fn default_quote_ticker() -> Ticker {
    Ticker::new(constants::DEFAULT_QUOTE_TICKER)
}

impl ExchangeConfig {
    #[must_use]
    pub fn new(admin: TraderId, exchange_account: TraderId) -> Self {
        Self {
            admin,
            exchange_account,
            quote_ticker: default_quote_ticker(),
        }
    }

    #[must_use]
    pub fn with_quote_ticker(mut self, quote_ticker: Ticker) -> Self {
        self.quote_ticker = quote_ticker;
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.admin.is_nil() {
            return Err(ClobError::Configuration("admin must not be nil".into()));
        }
        if self.exchange_account.is_nil() {
            return Err(ClobError::Configuration(
                "exchange_account must not be nil".into(),
            ));
        }
        if !self.quote_ticker.is_well_formed() {
            return Err(ClobError::Configuration(format!(
                "quote_ticker '{}' is not a valid ticker",
                self.quote_ticker
            )));
        }
        Ok(())
    }
}
