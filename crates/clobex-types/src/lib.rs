//! # clobex-types
//!
//! Shared types, errors, and configuration for the **clobex** exchange core.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`TraderId`], [`TradeId`], [`Ticker`], [`AssetRef`]
//! - **Registry model**: [`Token`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderType`]
//! - **Trade model**: [`Trade`]
//! - **Balance model**: [`BalanceEntry`]
//! - **Events**: [`ExchangeEvent`]
//! - **Configuration**: [`ExchangeConfig`]
//! - **Errors**: [`ClobError`] with `CLOB_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod token;
pub mod trade;

// Re-export all primary types at crate root:
//   use clobex_types::{Order, OrderSide, Trade, Ticker, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use token::*;
pub use trade::*;

// Constants are accessed via `clobex_types::constants::FOO`.
