//! Error types for the clobex exchange core.
//!
//! All errors use the `CLOB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation / access errors
//! - 2xx: Balance errors
//! - 3xx: Order book errors
//! - 4xx: Invariant errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{OrderId, Ticker, TraderId};

/// Central error enum for all clobex operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClobError {
    // =================================================================
    // Validation / Access Errors (1xx)
    // =================================================================
    /// Null trader or asset reference, or an asset already bound elsewhere.
    #[error("CLOB_ERR_100: Invalid address: {reason}")]
    InvalidAddress { reason: String },

    /// Empty, malformed, unknown, or already-registered ticker.
    #[error("CLOB_ERR_101: Invalid ticker '{ticker}': {reason}")]
    InvalidTicker { ticker: Ticker, reason: String },

    /// Zero or negative quantity.
    #[error("CLOB_ERR_102: Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Zero or negative limit price.
    #[error("CLOB_ERR_103: Invalid price: {0}")]
    InvalidPrice(Decimal),

    /// A non-admin caller invoked an admin-only operation.
    #[error("CLOB_ERR_104: Access denied for caller {caller}")]
    AccessDenied { caller: TraderId },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Ledger balance below the amount the operation needs.
    #[error("CLOB_ERR_200: Insufficient {ticker} balance: need {needed}, have {available}")]
    InsufficientBalance {
        ticker: Ticker,
        needed: Decimal,
        available: Decimal,
    },

    /// The custodial account could not cover a deposit (or refused a transfer).
    #[error(
        "CLOB_ERR_201: Insufficient external {ticker} balance: need {needed}, have {available}"
    )]
    InsufficientExternalBalance {
        ticker: Ticker,
        needed: Decimal,
        available: Decimal,
    },

    // =================================================================
    // Order Book Errors (3xx)
    // =================================================================
    /// The requested order is not resting in the book.
    #[error("CLOB_ERR_300: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this ID is already resting.
    #[error("CLOB_ERR_301: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order cannot rest in the book.
    #[error("CLOB_ERR_302: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    // =================================================================
    // Invariant Errors (4xx)
    // =================================================================
    /// Ledger total for a ticker drifted from the net custodied amount.
    #[error("CLOB_ERR_400: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// The book violates price-time ordering, fill bounds, or is crossed.
    #[error("CLOB_ERR_401: Book invariant violation: {reason}")]
    BookInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("CLOB_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Unrecoverable internal error.
    #[error("CLOB_ERR_901: Internal error: {0}")]
    Internal(String),
}

impl ClobError {
    /// Short, stable name of the failure kind, used in rejection events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "InvalidAddress",
            Self::InvalidTicker { .. } => "InvalidTicker",
            Self::InvalidAmount(_) => "InvalidAmount",
            Self::InvalidPrice(_) => "InvalidPrice",
            Self::AccessDenied { .. } => "AccessDenied",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::InsufficientExternalBalance { .. } => "InsufficientExternalBalance",
            Self::OrderNotFound(_) => "OrderNotFound",
            Self::DuplicateOrder(_) => "DuplicateOrder",
            Self::InvalidOrder { .. } => "InvalidOrder",
            Self::SupplyInvariantViolation { .. } => "SupplyInvariantViolation",
            Self::BookInvariantViolation { .. } => "BookInvariantViolation",
            Self::Configuration(_) => "Configuration",
            Self::Internal(_) => "Internal",
        }
    }

    pub fn invalid_ticker(ticker: &Ticker, reason: impl Into<String>) -> Self {
        Self::InvalidTicker {
            ticker: ticker.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_address(reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ClobError>;

impl From<serde_json::Error> for ClobError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
