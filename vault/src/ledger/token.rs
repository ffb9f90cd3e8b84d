//! # Token Primitives
//!
//! The ledger's own view of fungible tokens: a [`Mint`] per token type and a
//! [`TokenAccount`] per (owner, mint) balance. The vault program never edits
//! these directly; it asks the ledger to transfer, mint, burn, approve, and
//! revoke, and the ledger enforces the rules below.
//!
//! A token account may carry one [`Delegation`]: a second principal allowed
//! to move up to `amount` tokens out of the account until `expires_at_slot`.
//! Combine settlement relies on exactly this to stage its transfers.

use serde::{Deserialize, Serialize};

use crate::pubkey::Pubkey;

/// A token type and its supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    /// Principal allowed to mint new supply. `None` means fixed supply.
    pub mint_authority: Option<Pubkey>,
    /// Total tokens in existence.
    pub supply: u64,
    /// Display precision. Never used in arithmetic.
    pub decimals: u8,
}

/// Delegated spending rights over a token account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// The delegated principal.
    pub delegate: Pubkey,
    /// Tokens the delegate may still move.
    pub amount: u64,
    /// Last slot at which the delegation is honoured. `None` never expires.
    pub expires_at_slot: Option<u64>,
}

impl Delegation {
    /// Returns `true` once `slot` is past the expiry.
    pub fn is_expired(&self, slot: u64) -> bool {
        self.expires_at_slot.is_some_and(|expiry| slot > expiry)
    }

    /// Returns `true` if `delegate` may move `amount` tokens at `slot`.
    pub fn covers(&self, delegate: &Pubkey, amount: u64, slot: u64) -> bool {
        self.delegate == *delegate && self.amount >= amount && !self.is_expired(slot)
    }
}

/// A balance of one token type held by one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Token type of this account.
    pub mint: Pubkey,
    /// Principal that owns the balance.
    pub owner: Pubkey,
    /// Current balance in smallest units.
    pub amount: u64,
    /// Optional delegated spending rights.
    pub delegate: Option<Delegation>,
}

impl TokenAccount {
    /// Creates an empty account.
    pub fn new(mint: Pubkey, owner: Pubkey) -> Self {
        Self {
            mint,
            owner,
            amount: 0,
            delegate: None,
        }
    }
}
