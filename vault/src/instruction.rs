//! # Instructions
//!
//! One variant per vault operation, each with a fixed-shape accounts struct
//! and a fixed-shape argument struct. Nothing is looked up by position or by
//! string key: if an instruction needs an account, its struct names it.
//!
//! The vault's own transfer/mint authority is never part of an accounts
//! struct. It is a pure function of the vault address
//! ([`crate::pda::derive_authority`]) and the program derives it itself.
//!
//! Instructions are grouped into a [`Transaction`] together with the set of
//! principals that signed it. A transaction applies all of its instructions
//! or none of them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::pubkey::Pubkey;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Arguments for [`VaultInstruction::InitVault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitVaultArgs {
    /// Whether shares may be minted to the treasury after activation.
    pub allow_further_share_creation: bool,
}

/// A token amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountArgs {
    pub amount: u64,
}

/// A share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberOfShareArgs {
    pub number_of_shares: u64,
}

/// Arguments for [`VaultInstruction::UpdateExternalPriceAccount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPriceArgs {
    /// Price of one share in the smallest unit of `price_mint`.
    pub price_per_share: u64,
    /// Mint the buy-out is paid in.
    pub price_mint: Pubkey,
    /// Whether vaults priced by this record may combine.
    pub allowed_to_combine: bool,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Accounts for [`VaultInstruction::InitVault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitVaultAccounts {
    /// Address of the new vault record.
    pub vault: Pubkey,
    /// Empty mint whose authority is the vault's derived authority.
    pub fraction_mint: Pubkey,
    /// Empty price-mint account owned by the derived authority.
    pub redeem_treasury: Pubkey,
    /// Empty fraction-mint account owned by the derived authority.
    pub fraction_treasury: Pubkey,
    /// External price record.
    pub pricing_lookup_address: Pubkey,
    /// Authority of the new vault. Must sign.
    pub authority: Pubkey,
}

/// Accounts for [`VaultInstruction::AddTokenToInactiveVault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTokenToInactiveVaultAccounts {
    /// Address of the new box; must be the derived safety deposit address.
    pub safety_deposit: Pubkey,
    /// Source token account the deposit is taken from.
    pub token_account: Pubkey,
    /// Empty store owned by the derived authority.
    pub store: Pubkey,
    pub vault: Pubkey,
    /// Must sign.
    pub vault_authority: Pubkey,
    /// Owner or delegate of `token_account`. Must sign.
    pub transfer_authority: Pubkey,
}

/// Accounts for [`VaultInstruction::ActivateVault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateVaultAccounts {
    pub vault: Pubkey,
    pub fraction_mint: Pubkey,
    pub fraction_treasury: Pubkey,
    /// Must sign.
    pub vault_authority: Pubkey,
}

/// Accounts for [`VaultInstruction::CombineVault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineVaultAccounts {
    pub vault: Pubkey,
    /// The authority's fraction-mint account; its shares are burned.
    pub your_outstanding_shares: Pubkey,
    /// The authority's price-mint account; pays for everyone else's shares.
    pub your_payment: Pubkey,
    pub fraction_mint: Pubkey,
    pub fraction_treasury: Pubkey,
    pub redeem_treasury: Pubkey,
    /// Must sign.
    pub vault_authority: Pubkey,
    /// Delegate approved on both staged accounts. Must sign.
    pub transfer_authority: Pubkey,
    pub external_pricing: Pubkey,
}

/// Accounts for [`VaultInstruction::MintFractionalShares`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintFractionalSharesAccounts {
    pub fraction_treasury: Pubkey,
    pub fraction_mint: Pubkey,
    pub vault: Pubkey,
    /// Must sign.
    pub vault_authority: Pubkey,
}

/// Accounts for [`VaultInstruction::WithdrawTokenFromSafetyDepositBox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawTokenFromSafetyDepositBoxAccounts {
    /// Receives the tokens; must hold the box's token mint.
    pub destination: Pubkey,
    pub safety_deposit: Pubkey,
    pub store: Pubkey,
    pub vault: Pubkey,
    pub fraction_mint: Pubkey,
    /// Must sign.
    pub vault_authority: Pubkey,
}

/// Accounts for [`VaultInstruction::WithdrawSharesFromTreasury`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawSharesFromTreasuryAccounts {
    /// Receives the shares; must hold the fraction mint.
    pub destination: Pubkey,
    pub fraction_treasury: Pubkey,
    pub vault: Pubkey,
    /// Must sign.
    pub vault_authority: Pubkey,
}

/// Accounts for [`VaultInstruction::AddSharesToTreasury`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSharesToTreasuryAccounts {
    /// Fraction-mint account the shares come from.
    pub source: Pubkey,
    pub fraction_treasury: Pubkey,
    pub vault: Pubkey,
    /// Owner or delegate of `source`. Must sign.
    pub transfer_authority: Pubkey,
    /// Must sign.
    pub vault_authority: Pubkey,
}

/// Accounts for [`VaultInstruction::RedeemShares`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemSharesAccounts {
    /// Holder's fraction-mint account; all of it is burned.
    pub outstanding_shares: Pubkey,
    /// Holder's price-mint account receiving the payout.
    pub proceeds: Pubkey,
    pub fraction_mint: Pubkey,
    pub redeem_treasury: Pubkey,
    /// Owner of `outstanding_shares`. Must sign.
    pub transfer_authority: Pubkey,
    pub vault: Pubkey,
}

/// Accounts for [`VaultInstruction::UpdateExternalPriceAccount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateExternalPriceAccounts {
    pub external_price_account: Pubkey,
    /// Creator (first update) or recorded authority. Must sign.
    pub authority: Pubkey,
}

/// Accounts for [`VaultInstruction::SetAuthority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAuthorityAccounts {
    pub vault: Pubkey,
    /// Must sign.
    pub current_authority: Pubkey,
    pub new_authority: Pubkey,
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// Every operation the vault program understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
pub enum VaultInstruction {
    InitVault {
        accounts: InitVaultAccounts,
        args: InitVaultArgs,
    },
    AddTokenToInactiveVault {
        accounts: AddTokenToInactiveVaultAccounts,
        args: AmountArgs,
    },
    ActivateVault {
        accounts: ActivateVaultAccounts,
        args: NumberOfShareArgs,
    },
    CombineVault {
        accounts: CombineVaultAccounts,
    },
    MintFractionalShares {
        accounts: MintFractionalSharesAccounts,
        args: NumberOfShareArgs,
    },
    WithdrawTokenFromSafetyDepositBox {
        accounts: WithdrawTokenFromSafetyDepositBoxAccounts,
        args: AmountArgs,
    },
    WithdrawSharesFromTreasury {
        accounts: WithdrawSharesFromTreasuryAccounts,
        args: NumberOfShareArgs,
    },
    AddSharesToTreasury {
        accounts: AddSharesToTreasuryAccounts,
        args: NumberOfShareArgs,
    },
    RedeemShares {
        accounts: RedeemSharesAccounts,
    },
    UpdateExternalPriceAccount {
        accounts: UpdateExternalPriceAccounts,
        args: ExternalPriceArgs,
    },
    SetAuthority {
        accounts: SetAuthorityAccounts,
    },
}

impl VaultInstruction {
    /// The label the program logs when it starts processing the instruction.
    pub fn name(&self) -> &'static str {
        match self {
            VaultInstruction::InitVault { .. } => "Init Vault",
            VaultInstruction::AddTokenToInactiveVault { .. } => "Add token to inactive vault",
            VaultInstruction::ActivateVault { .. } => "Activate Vault",
            VaultInstruction::CombineVault { .. } => "Combine Vault",
            VaultInstruction::MintFractionalShares { .. } => "Mint new fractional shares",
            VaultInstruction::WithdrawTokenFromSafetyDepositBox { .. } => {
                "Withdraw Token from Safety Deposit Box"
            }
            VaultInstruction::WithdrawSharesFromTreasury { .. } => "Withdraw shares from treasury",
            VaultInstruction::AddSharesToTreasury { .. } => "Add shares to treasury",
            VaultInstruction::RedeemShares { .. } => "Redeem Shares",
            VaultInstruction::UpdateExternalPriceAccount { .. } => "Update External Price Account",
            VaultInstruction::SetAuthority { .. } => "Set Authority",
        }
    }

    /// The vault this instruction operates on, if it targets one.
    pub fn vault(&self) -> Option<&Pubkey> {
        match self {
            VaultInstruction::InitVault { accounts, .. } => Some(&accounts.vault),
            VaultInstruction::AddTokenToInactiveVault { accounts, .. } => Some(&accounts.vault),
            VaultInstruction::ActivateVault { accounts, .. } => Some(&accounts.vault),
            VaultInstruction::CombineVault { accounts } => Some(&accounts.vault),
            VaultInstruction::MintFractionalShares { accounts, .. } => Some(&accounts.vault),
            VaultInstruction::WithdrawTokenFromSafetyDepositBox { accounts, .. } => {
                Some(&accounts.vault)
            }
            VaultInstruction::WithdrawSharesFromTreasury { accounts, .. } => Some(&accounts.vault),
            VaultInstruction::AddSharesToTreasury { accounts, .. } => Some(&accounts.vault),
            VaultInstruction::RedeemShares { accounts } => Some(&accounts.vault),
            VaultInstruction::UpdateExternalPriceAccount { .. } => None,
            VaultInstruction::SetAuthority { accounts } => Some(&accounts.vault),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An ordered batch of instructions plus the principals that signed it.
///
/// ```
/// use token_vault::instruction::{
///     MintFractionalSharesAccounts, NumberOfShareArgs, Transaction, VaultInstruction,
/// };
/// use token_vault::Pubkey;
///
/// let authority = Pubkey::new_unique();
/// let tx = Transaction::new()
///     .add(VaultInstruction::MintFractionalShares {
///         accounts: MintFractionalSharesAccounts {
///             fraction_treasury: Pubkey::new_unique(),
///             fraction_mint: Pubkey::new_unique(),
///             vault: Pubkey::new_unique(),
///             vault_authority: authority,
///         },
///         args: NumberOfShareArgs { number_of_shares: 5 },
///     })
///     .sign(authority);
/// assert!(tx.is_signed_by(&authority));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub instructions: Vec<VaultInstruction>,
    pub signers: BTreeSet<Pubkey>,
}

impl Transaction {
    /// Creates an empty, unsigned transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction.
    pub fn add(mut self, instruction: VaultInstruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Appends several instructions in order.
    pub fn add_all(mut self, instructions: impl IntoIterator<Item = VaultInstruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    /// Records `signer` as having signed the transaction.
    pub fn sign(mut self, signer: Pubkey) -> Self {
        self.signers.insert(signer);
        self
    }

    /// Records several signers.
    pub fn sign_all(mut self, signers: impl IntoIterator<Item = Pubkey>) -> Self {
        self.signers.extend(signers);
        self
    }

    /// Returns `true` if `key` is among the signers.
    pub fn is_signed_by(&self, key: &Pubkey) -> bool {
        self.signers.contains(key)
    }
}
