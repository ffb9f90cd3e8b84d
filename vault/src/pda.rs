//! # Derived Addresses
//!
//! Authorities and records the program owns are not stored relations; they
//! are pure functions of the addresses they belong to. Given a vault, anyone
//! can recompute its transfer/mint authority, and given a vault and a token
//! mint, anyone can recompute where that mint's safety deposit box lives.
//!
//! The derivation hashes the seeds, a bump byte, the program id, and a
//! fixed marker with SHA-256:
//!
//! ```text
//! address = SHA-256(seed_0 || ... || seed_n || [bump] || program_id || "ProgramDerivedAddress")
//! ```
//!
//! The bump is fixed at 255. There is no curve to fall off here, so the
//! canonical bump is always the first one tried.

use sha2::{Digest, Sha256};

use crate::config::{PDA_MARKER, PREFIX};
use crate::pubkey::Pubkey;

/// Bump used for every derivation.
pub const CANONICAL_BUMP: u8 = u8::MAX;

/// Derives a program address from raw seeds.
pub fn create_program_address(seeds: &[&[u8]], bump: u8, program_id: &Pubkey) -> Pubkey {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    Pubkey::new_from_array(hasher.finalize().into())
}

/// Finds the canonical program address and bump for the given seeds.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
    (
        create_program_address(seeds, CANONICAL_BUMP, program_id),
        CANONICAL_BUMP,
    )
}

/// The vault's transfer and mint authority.
///
/// Seeds: `["vault", program_id, vault]`. Owns every store and treasury
/// account of the vault and is the mint authority of its fraction mint.
pub fn derive_authority(program_id: &Pubkey, vault: &Pubkey) -> Pubkey {
    find_program_address(
        &[PREFIX.as_bytes(), program_id.as_ref(), vault.as_ref()],
        program_id,
    )
    .0
}

/// The safety deposit box record for `token_mint` inside `vault`.
///
/// Seeds: `["vault", vault, token_mint]`. One mint maps to exactly one box
/// address, which is what keeps boxes unique per token type.
pub fn derive_safety_deposit(program_id: &Pubkey, vault: &Pubkey, token_mint: &Pubkey) -> Pubkey {
    find_program_address(
        &[PREFIX.as_bytes(), vault.as_ref(), token_mint.as_ref()],
        program_id,
    )
    .0
}
