//! # Client Helpers
//!
//! Account setup and instruction builders for driving the vault program the
//! way a wallet or test harness would: allocate the token accounts the
//! program expects, stage approvals, then submit typed instructions.
//!
//! ```text
//! init.rs            - InitVaultSetup, init_vault, init_and_activate_vault
//! safety_deposit.rs  - SafetyDepositSetup, deposit and withdraw helpers
//! combine.rs         - CombineVaultSetup, two-phase combine
//! ```
//!
//! Account allocation and approvals go straight to the ledger; only vault
//! instructions go through [`crate::processor::VaultProgram::submit`].

pub mod combine;
pub mod init;
pub mod safety_deposit;

pub use combine::{activate_and_combine_vault, combine_vault, CombineSettlement, CombineVaultSetup};
pub use init::{init_and_activate_vault, init_vault, InitVaultSetup};
pub use safety_deposit::{
    add_safety_deposit, setup_withdraw_destination, withdraw_to_new_destination,
    SafetyDepositSetup,
};
