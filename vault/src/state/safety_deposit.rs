//! Safety deposit box record: binds one store (a token account holding a
//! single token type) to its vault. Created only while the vault is
//! inactive, never deleted. Once a store is emptied the box record stays
//! behind, flagged as emptied, even if tokens are later sent to its store.

use serde::{Deserialize, Serialize};

use crate::pubkey::Pubkey;

/// A per-token-type custody record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyDepositBox {
    /// Owning vault.
    pub vault: Pubkey,
    /// The token type held in `store`.
    pub token_mint: Pubkey,
    /// Token account holding this box's balance, owned by the vault authority.
    pub store: Pubkey,
    /// Insertion order within the vault, starting at zero.
    pub order: u8,
    /// Set by the first withdrawal that empties the store. A box is counted
    /// out of `token_type_count` at most once.
    #[serde(default)]
    pub emptied: bool,
}
