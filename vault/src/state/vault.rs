//! # Vault Record
//!
//! The vault is the top-level custody record. It owns zero or more safety
//! deposit boxes and exactly one fraction mint, and walks a strictly linear
//! lifecycle:
//!
//! ```text
//! Inactive ──activate──► Active ──combine──► Combined ──(empty)──► Deactivated
//! ```
//!
//! No state is ever skipped and none is ever revisited.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::pubkey::Pubkey;

/// Lifecycle state of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultState {
    /// Accepting safety deposit boxes; no shares exist yet.
    Inactive,
    /// Shares issued; boxes are locked in.
    Active,
    /// Bought out at a locked price; tokens can be withdrawn and shares redeemed.
    Combined,
    /// Empty and retired. Terminal.
    Deactivated,
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultState::Inactive => write!(f, "Inactive"),
            VaultState::Active => write!(f, "Active"),
            VaultState::Combined => write!(f, "Combined"),
            VaultState::Deactivated => write!(f, "Deactivated"),
        }
    }
}

/// A token vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Mint of the vault's fractional shares.
    pub fraction_mint: Pubkey,
    /// The only principal allowed to mutate the vault.
    pub authority: Pubkey,
    /// Token account (fraction mint) that receives newly minted shares.
    pub fraction_treasury: Pubkey,
    /// Token account (price mint) that collects buy-out payments.
    pub redeem_treasury: Pubkey,
    /// Whether shares may be minted to the treasury after activation.
    pub allow_further_share_creation: bool,
    /// External price record consulted at combine time.
    pub pricing_lookup_address: Pubkey,
    /// Number of token types currently custodied.
    pub token_type_count: u8,
    /// Lifecycle state.
    pub state: VaultState,
    /// Price per share fixed by combine; zero before that.
    pub locked_price_per_share: u64,
}

impl Vault {
    /// Fails with [`VaultError::InvalidState`] unless the vault is in `expected`.
    pub fn require_state(&self, expected: VaultState) -> Result<(), VaultError> {
        if self.state != expected {
            return Err(VaultError::InvalidState {
                current: self.state,
                expected: expected.to_string(),
            });
        }
        Ok(())
    }

    /// Applies the deactivation rule: an empty vault with no outstanding
    /// shares is retired. Only ever moves `Combined` to `Deactivated`.
    ///
    /// Returns `true` if the vault was deactivated by this call.
    pub fn deactivate_if_empty(&mut self, fraction_supply: u64) -> bool {
        if self.state == VaultState::Combined && self.token_type_count == 0 && fraction_supply == 0
        {
            self.state = VaultState::Deactivated;
            return true;
        }
        false
    }
}
