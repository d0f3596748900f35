//! Registry entries binding a ticker to its external asset.

use serde::{Deserialize, Serialize};

use crate::{AssetRef, Ticker};

/// A tradable instrument. Unique by `ticker` and by `asset_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub ticker: Ticker,
    pub asset_ref: AssetRef,
}

impl Token {
    #[must_use]
    pub fn new(ticker: Ticker, asset_ref: AssetRef) -> Self {
        Self { ticker, asset_ref }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.ticker, self.asset_ref)
    }
}
