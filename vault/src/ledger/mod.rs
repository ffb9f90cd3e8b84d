//! # Ledger Service
//!
//! The vault program does not hold balances and does not persist anything
//! itself. Everything it reads or writes goes through a [`LedgerService`]:
//! an injected capability that owns accounts, moves tokens atomically, and
//! knows the current slot.
//!
//! ```text
//! mod.rs     - LedgerService trait, account model, LedgerError
//! token.rs   - Mint / TokenAccount / Delegation records
//! memory.rs  - InMemoryLedger, the deterministic implementation
//! ```
//!
//! Keeping the ledger behind a trait is what lets the state machine run in
//! unit tests with no cluster, and what keeps global mutable state out of
//! the program: the caller hands a ledger in, the program hands it back.

pub mod memory;
pub mod token;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pubkey::Pubkey;
use crate::state::{ExternalPriceAccount, SafetyDepositBox, Vault};

pub use memory::InMemoryLedger;
pub use token::{Delegation, Mint, TokenAccount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by ledger primitives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// No account exists at the address.
    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Tried to create an account at an address already in use.
    #[error("account already exists: {0}")]
    AccountAlreadyExists(Pubkey),

    /// The account exists but holds a different kind of record.
    #[error("account {address} is not a {expected}")]
    AccountTypeMismatch {
        /// The offending address.
        address: Pubkey,
        /// The record kind the caller asked for.
        expected: &'static str,
    },

    /// A debit exceeds the account balance.
    #[error("insufficient balance in {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The account being debited.
        account: Pubkey,
        /// Its current balance.
        available: u64,
        /// The amount requested.
        requested: u64,
    },

    /// Source and destination (or mint and account) disagree on the token type.
    #[error("mint mismatch: expected {expected}, found {found}")]
    MintMismatch {
        /// The mint the operation requires.
        expected: Pubkey,
        /// The mint actually found.
        found: Pubkey,
    },

    /// The authority is neither the owner nor a sufficient delegate.
    #[error("{authority} may not move tokens out of {account}")]
    OwnerMismatch {
        /// The account being debited.
        account: Pubkey,
        /// The principal that attempted it.
        authority: Pubkey,
    },

    /// The delegate's approval has lapsed.
    #[error("delegation on {account} expired at slot {expired_at}")]
    DelegationExpired {
        /// The delegated account.
        account: Pubkey,
        /// Last slot the delegation was valid.
        expired_at: u64,
    },

    /// The authority does not control the mint.
    #[error("{authority} is not the mint authority of {mint}")]
    MintAuthorityMismatch {
        /// The mint.
        mint: Pubkey,
        /// The principal that attempted to mint.
        authority: Pubkey,
    },

    /// A balance or supply would exceed `u64::MAX`.
    #[error("arithmetic overflow on {0}")]
    Overflow(Pubkey),
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Every kind of record the ledger stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Account {
    /// A token mint.
    Mint(Mint),
    /// A token balance.
    Token(TokenAccount),
    /// A vault record.
    Vault(Vault),
    /// A safety deposit box record.
    SafetyDeposit(SafetyDepositBox),
    /// An external price record.
    ExternalPrice(ExternalPriceAccount),
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Capability the vault program uses to reach shared ledger state.
///
/// Implementations must apply each primitive atomically: a call either takes
/// full effect or returns an error and changes nothing. Atomicity across a
/// whole transaction is layered on top by the program (see
/// [`crate::processor::VaultProgram::submit`]).
pub trait LedgerService {
    /// The current slot. Monotonic.
    fn slot(&self) -> u64;

    /// Moves the clock forward by `slots`.
    fn advance_slots(&mut self, slots: u64);

    /// Returns `true` if any record lives at `address`.
    fn exists(&self, address: &Pubkey) -> bool;

    /// Reads a mint.
    fn mint(&self, address: &Pubkey) -> Result<Mint, LedgerError>;

    /// Reads a token account.
    fn token_account(&self, address: &Pubkey) -> Result<TokenAccount, LedgerError>;

    /// Reads a vault record.
    fn vault(&self, address: &Pubkey) -> Result<Vault, LedgerError>;

    /// Reads a safety deposit box record.
    fn safety_deposit(&self, address: &Pubkey) -> Result<SafetyDepositBox, LedgerError>;

    /// Reads an external price record.
    fn external_price(&self, address: &Pubkey) -> Result<ExternalPriceAccount, LedgerError>;

    /// Creates an empty mint.
    fn create_mint(
        &mut self,
        address: Pubkey,
        mint_authority: Pubkey,
        decimals: u8,
    ) -> Result<(), LedgerError>;

    /// Creates an empty token account.
    fn create_token_account(
        &mut self,
        address: Pubkey,
        mint: Pubkey,
        owner: Pubkey,
    ) -> Result<(), LedgerError>;

    /// Writes a vault record, creating it if absent.
    fn put_vault(&mut self, address: Pubkey, vault: Vault) -> Result<(), LedgerError>;

    /// Writes a safety deposit box record, creating it if absent.
    fn put_safety_deposit(
        &mut self,
        address: Pubkey,
        safety_deposit: SafetyDepositBox,
    ) -> Result<(), LedgerError>;

    /// Writes an external price record, creating it if absent.
    fn put_external_price(
        &mut self,
        address: Pubkey,
        price: ExternalPriceAccount,
    ) -> Result<(), LedgerError>;

    /// Moves `amount` tokens from `source` to `destination`.
    ///
    /// `authority` must own `source` or hold an unexpired delegation covering
    /// `amount`, which is consumed.
    fn transfer(
        &mut self,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Mints `amount` new tokens into `destination`.
    fn mint_to(
        &mut self,
        mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Destroys `amount` tokens held in `account`.
    ///
    /// Same authority rules as [`transfer`](Self::transfer).
    fn burn(
        &mut self,
        account: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Sets the delegation on `account`. Only the owner may approve.
    fn approve(
        &mut self,
        account: &Pubkey,
        owner: &Pubkey,
        delegation: Delegation,
    ) -> Result<(), LedgerError>;

    /// Clears any delegation on `account`. The owner or the delegate may
    /// revoke; revoking an account with no delegation is a no-op.
    fn revoke(&mut self, account: &Pubkey, authority: &Pubkey) -> Result<(), LedgerError>;
}
