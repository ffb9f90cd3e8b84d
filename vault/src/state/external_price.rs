//! External price record consulted when a vault is combined.

use serde::{Deserialize, Serialize};

use crate::pubkey::Pubkey;

/// Price quote for one share of a vault, denominated in `price_mint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPriceAccount {
    /// Principal allowed to update this record.
    pub authority: Pubkey,
    /// Price of a single share, in the smallest unit of `price_mint`.
    pub price_per_share: u64,
    /// Mint the buy-out is paid in.
    pub price_mint: Pubkey,
    /// Whether a vault priced by this record may be combined.
    pub allowed_to_combine: bool,
}
