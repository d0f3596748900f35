//! # clobex-engine
//!
//! **Continuous limit order book exchange.**
//!
//! [`Exchange`] ties the token registry, the custodial ledger and one
//! order book per ticker together. Every ticker trades against a single
//! quote asset.
//!
//! ## Order Flow
//!
//! ```text
//! limit_order:  validate → sweep opposite side → freeze escrow → rest remainder
//! market_order: validate → sweep opposite side → discard remainder (IOC)
//! ```
//!
//! Fills always execute at the resting (maker) order's price. The maker
//! pays out of escrow frozen when it rested; the taker pays out of its
//! available balance.
//!
//! ## Money Flow
//!
//! ```text
//! deposit:  Custody.transfer_from(trader → exchange) → ledger credit
//! withdraw: ledger debit → Custody.transfer(exchange → trader), rolled back on failure
//! ```

pub mod exchange;
pub mod logging;
mod matching;
pub mod outcome;
pub mod shared;

pub use exchange::Exchange;
pub use logging::init_logging;
pub use outcome::{OrderOutcome, OrderStatus};
pub use shared::SharedExchange;
