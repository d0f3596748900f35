//! # clobex-book
//!
//! **Price-time priority order book for clobex.**
//!
//! One [`OrderBook`] per ticker holds the resting limit orders of both
//! sides. The book never matches on its own: the engine walks the levels
//! of a side best-first, decides whether they cross (see [`crossing`]),
//! fills orders in place and removes each by id once it is exhausted.
//!
//! - **Bids**: best (highest) price first, then earliest sequence
//! - **Asks**: best (lowest) price first, then earliest sequence
//! - **Exact removal**: orders leave the book by id, never by position

pub mod crossing;
pub mod orderbook;
pub mod price_level;

pub use crossing::crosses;
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
