//! # Program-Owned Records
//!
//! The records the vault program writes to the ledger. Token balances are
//! not here: those live in the ledger's own mint and token-account records
//! (see [`crate::ledger::token`]), and the program only moves them through
//! ledger primitives.
//!
//! ```text
//! vault.rs           - Vault and its lifecycle state
//! safety_deposit.rs  - one box per custodied token type
//! external_price.rs  - buy-out price consulted by combine
//! ```

pub mod external_price;
pub mod safety_deposit;
pub mod vault;

pub use external_price::ExternalPriceAccount;
pub use safety_deposit::SafetyDepositBox;
pub use vault::{Vault, VaultState};
