//! # Addresses
//!
//! Every record the vault program touches -- mints, token accounts, vaults,
//! safety deposit boxes, price records -- lives at a 32-byte address. The
//! ledger service addresses accounts by [`Pubkey`] and nothing else.
//!
//! Addresses render as base58, the same alphabet wallets and explorers use,
//! and serialize as base58 strings so that ledger snapshots stay readable
//! as JSON (and so that a `Pubkey` can be a JSON map key).

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of an address in bytes.
pub const PUBKEY_BYTES: usize = 32;

/// Errors from parsing a base58 address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePubkeyError {
    /// The string is not valid base58.
    #[error("invalid base58 address: {0}")]
    InvalidBase58(String),

    /// The decoded bytes are not exactly 32 long.
    #[error("invalid address length: expected {PUBKEY_BYTES} bytes, got {0}")]
    WrongLength(usize),
}

/// A 32-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    /// Wraps raw address bytes.
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Returns a fresh random address.
    ///
    /// Stands in for keypair generation: the ledger never checks
    /// signatures, only that the right address is in the signer set.
    pub fn new_unique() -> Self {
        let mut bytes = [0u8; PUBKEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ParsePubkeyError::InvalidBase58(e.to_string()))?;
        let array: [u8; PUBKEY_BYTES] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParsePubkeyError::WrongLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
