// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Vault Core Library
//!
//! A custody protocol for fungible tokens. A vault locks one or more token
//! types in safety deposit boxes, issues fractional shares against them, and
//! can later be bought out ("combined") at an externally quoted price, after
//! which the boxes are emptied and the shares redeemed.
//!
//! The library reconstructs the on-chain program as a deterministic state
//! machine that runs against an injected ledger. Transport and key
//! management belong to whoever submits the transactions.
//!
//! ## Architecture
//!
//! - **pubkey**: 32-byte addresses, base58 on the outside.
//! - **pda**: Derived authorities and box addresses. Pure functions.
//! - **config**: Protocol constants and the policy knobs of [`VaultConfig`].
//! - **ledger**: The [`LedgerService`] capability and [`InMemoryLedger`].
//! - **state**: Records the program owns: vaults, boxes, price quotes.
//! - **instruction**: Typed instructions and transactions.
//! - **processor**: [`VaultProgram`]: validation and state transitions.
//! - **client**: Account setup and the two-phase combine.
//! - **error**: [`VaultError`] and its fieldless [`ErrorKind`].
//!
//! ## Lifecycle
//!
//! ```text
//! Inactive ──activate──► Active ──combine──► Combined ──(empty)──► Deactivated
//!   add boxes            mint shares         withdraw tokens
//!                                            redeem shares
//! ```
//!
//! ## Quick start
//!
//! ```
//! use token_vault::client::{add_safety_deposit, init_vault};
//! use token_vault::{InMemoryLedger, Pubkey, VaultConfig, VaultProgram, VaultState};
//! use token_vault::ledger::LedgerService;
//!
//! let program = VaultProgram::new(VaultConfig::default());
//! let mut ledger = InMemoryLedger::new();
//! let authority = Pubkey::new_unique();
//!
//! let (vault, _) = init_vault(&mut ledger, &program, authority, true).unwrap();
//! add_safety_deposit(&mut ledger, &program, &vault, 2).unwrap();
//!
//! let record = ledger.vault(&vault.vault).unwrap();
//! assert_eq!(record.state, VaultState::Inactive);
//! assert_eq!(record.token_type_count, 1);
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod pda;
pub mod processor;
pub mod pubkey;
pub mod state;

pub use config::VaultConfig;
pub use error::{ErrorKind, VaultError};
pub use instruction::{Transaction, VaultInstruction};
pub use ledger::{InMemoryLedger, LedgerService};
pub use processor::{TokenBalanceChange, TransactionReceipt, VaultProgram};
pub use pubkey::Pubkey;
pub use state::{ExternalPriceAccount, SafetyDepositBox, Vault, VaultState};
