//! # clobex-ledger
//!
//! **Instrument registry and custodial balance ledger.**
//!
//! ## Components
//!
//! 1. **TokenRegistry**: admin-curated ticker → external asset mapping
//! 2. **Ledger**: per-(trader, ticker) available/frozen balances
//! 3. **Custody**: the external asset-transfer capability, consumed as a trait
//! 4. **SupplyConservation**: ledger totals vs. net custodied amounts
//!
//! ## Money Flow
//!
//! ```text
//! deposit:   Custody.transfer_from(trader → exchange) → Ledger.credit()
//! withdraw:  Ledger.debit() → Custody.transfer(exchange → trader)  [rollback on failure]
//! trading:   Ledger.freeze / transfer_available / transfer_frozen  [no external call]
//! ```

pub mod custody;
pub mod ledger;
pub mod registry;
pub mod supply_conservation;

pub use custody::{Custody, InMemoryCustody};
pub use ledger::Ledger;
pub use registry::TokenRegistry;
pub use supply_conservation::SupplyConservation;
