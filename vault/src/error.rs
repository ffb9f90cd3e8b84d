//! Error types for the vault program.
//!
//! Every instruction that can fail returns a [`VaultError`]. Failures are
//! always policy violations: the program is deterministic, so resubmitting
//! the same instruction against the same ledger state fails the same way.
//! Transient faults belong to whoever transports transactions, not here.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::pubkey::Pubkey;
use crate::state::VaultState;

/// Errors that can occur while processing a vault instruction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The vault account has already been initialized.
    #[error("vault {0} is already initialized")]
    AlreadyInitialized(Pubkey),

    /// The instruction is illegal in the vault's current state.
    #[error("invalid vault state: vault is {current}, expected {expected}")]
    InvalidState {
        /// The vault's current state.
        current: VaultState,
        /// The state(s) the instruction requires.
        expected: String,
    },

    /// A withdrawal or transfer exceeds the available balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount the caller asked for.
        requested: u64,
        /// Amount actually available.
        available: u64,
    },

    /// The vault does not allow the minting of new shares.
    #[error("shares locked: vault does not allow the minting of new shares")]
    SharesLocked,

    /// The combine settlement was not fully staged or approved.
    #[error("incomplete settlement: {0}")]
    IncompleteSettlement(String),

    /// The amount must be greater than zero.
    #[error("invalid amount: must be greater than zero")]
    InvalidAmount,

    /// A required signer is missing or is not the expected principal.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An account does not stand in the relationship the instruction needs.
    #[error("invalid account: {0}")]
    InvalidAccount(String),

    /// The vault already holds a box for this token mint.
    #[error("vault {vault} already has a safety deposit box for mint {token_mint}")]
    DuplicateSafetyDeposit {
        /// The vault.
        vault: Pubkey,
        /// The token mint already custodied.
        token_mint: Pubkey,
    },

    /// The external price record does not allow combining.
    #[error("external price account {0} does not allow combining")]
    NotCombinable(Pubkey),

    /// An arithmetic overflow would occur.
    #[error("amount overflow: operation would exceed allowed limits")]
    AmountOverflow,

    /// Any other ledger failure.
    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for VaultError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                available,
                requested,
                ..
            } => VaultError::InsufficientBalance {
                requested,
                available,
            },
            LedgerError::Overflow(_) => VaultError::AmountOverflow,
            other => VaultError::Ledger(other),
        }
    }
}

/// Fieldless classification of [`VaultError`], for assertions and for
/// machine-readable reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AlreadyInitialized,
    InvalidState,
    InsufficientBalance,
    SharesLocked,
    IncompleteSettlement,
    InvalidAmount,
    Unauthorized,
    InvalidAccount,
    DuplicateSafetyDeposit,
    NotCombinable,
    AmountOverflow,
    Ledger,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl VaultError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::AlreadyInitialized(_) => ErrorKind::AlreadyInitialized,
            VaultError::InvalidState { .. } => ErrorKind::InvalidState,
            VaultError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            VaultError::SharesLocked => ErrorKind::SharesLocked,
            VaultError::IncompleteSettlement(_) => ErrorKind::IncompleteSettlement,
            VaultError::InvalidAmount => ErrorKind::InvalidAmount,
            VaultError::Unauthorized(_) => ErrorKind::Unauthorized,
            VaultError::InvalidAccount(_) => ErrorKind::InvalidAccount,
            VaultError::DuplicateSafetyDeposit { .. } => ErrorKind::DuplicateSafetyDeposit,
            VaultError::NotCombinable(_) => ErrorKind::NotCombinable,
            VaultError::AmountOverflow => ErrorKind::AmountOverflow,
            VaultError::Ledger(_) => ErrorKind::Ledger,
        }
    }
}
