//! System-wide constants for the clobex exchange core.

/// Decimal places kept when a market BUY derives an affordable quantity
/// from its remaining quote balance.
pub const QTY_PRECISION: u32 = 8;

/// Maximum ticker length in bytes (a 32-byte instrument key).
pub const MAX_TICKER_LEN: usize = 32;

/// Length of an external asset reference in bytes.
pub const ASSET_REF_LEN: usize = 20;

/// Quote asset used when the configuration does not name one.
pub const DEFAULT_QUOTE_TICKER: &str = "USDT";
