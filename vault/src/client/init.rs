//! Vault creation and the instruction builders that only need the vault's
//! own accounts.

use tracing::debug;

use crate::config::FRACTION_DECIMALS;
use crate::error::VaultError;
use crate::instruction::{
    ActivateVaultAccounts, AddSharesToTreasuryAccounts, ExternalPriceArgs, InitVaultAccounts,
    InitVaultArgs, MintFractionalSharesAccounts, NumberOfShareArgs, RedeemSharesAccounts,
    SetAuthorityAccounts, Transaction, UpdateExternalPriceAccounts, VaultInstruction,
    WithdrawSharesFromTreasuryAccounts,
};
use crate::ledger::LedgerService;
use crate::processor::{TransactionReceipt, VaultProgram};
use crate::pubkey::Pubkey;

/// Every account a new vault is wired to.
///
/// [`create`](Self::create) allocates the mints and token accounts the
/// program expects to find; the vault record itself is only written when
/// the `InitVault` instruction from [`instructions`](Self::instructions)
/// is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitVaultSetup {
    pub vault: Pubkey,
    /// Vault authority; signs every vault mutation.
    pub authority: Pubkey,
    /// The vault's derived transfer/mint authority.
    pub fraction_mint_authority: Pubkey,
    pub fraction_mint: Pubkey,
    pub fraction_treasury: Pubkey,
    pub redeem_treasury: Pubkey,
    /// Mint the buy-out is paid in.
    pub price_mint: Pubkey,
    /// Mint authority of `price_mint`, for funding payments in tests and
    /// scenarios.
    pub price_mint_authority: Pubkey,
    pub pricing_lookup_address: Pubkey,
}

impl InitVaultSetup {
    /// Allocates the fraction mint, price mint, and both treasuries.
    pub fn create<L: LedgerService>(
        ledger: &mut L,
        program: &VaultProgram,
        authority: Pubkey,
    ) -> Result<Self, VaultError> {
        let vault = Pubkey::new_unique();
        let derived = program.derived_authority(&vault);

        let setup = Self {
            vault,
            authority,
            fraction_mint_authority: derived,
            fraction_mint: Pubkey::new_unique(),
            fraction_treasury: Pubkey::new_unique(),
            redeem_treasury: Pubkey::new_unique(),
            price_mint: Pubkey::new_unique(),
            price_mint_authority: Pubkey::new_unique(),
            pricing_lookup_address: Pubkey::new_unique(),
        };

        ledger.create_mint(setup.price_mint, setup.price_mint_authority, 0)?;
        ledger.create_mint(setup.fraction_mint, derived, FRACTION_DECIMALS)?;
        ledger.create_token_account(setup.fraction_treasury, setup.fraction_mint, derived)?;
        ledger.create_token_account(setup.redeem_treasury, setup.price_mint, derived)?;

        debug!(vault = %vault, "vault accounts allocated");
        Ok(setup)
    }

    /// Price record write (price zero, combinable) followed by `InitVault`.
    pub fn instructions(&self, allow_further_share_creation: bool) -> Vec<VaultInstruction> {
        vec![
            self.update_external_price(0, true),
            VaultInstruction::InitVault {
                accounts: InitVaultAccounts {
                    vault: self.vault,
                    fraction_mint: self.fraction_mint,
                    redeem_treasury: self.redeem_treasury,
                    fraction_treasury: self.fraction_treasury,
                    pricing_lookup_address: self.pricing_lookup_address,
                    authority: self.authority,
                },
                args: InitVaultArgs {
                    allow_further_share_creation,
                },
            },
        ]
    }

    pub fn update_external_price(
        &self,
        price_per_share: u64,
        allowed_to_combine: bool,
    ) -> VaultInstruction {
        VaultInstruction::UpdateExternalPriceAccount {
            accounts: UpdateExternalPriceAccounts {
                external_price_account: self.pricing_lookup_address,
                authority: self.authority,
            },
            args: ExternalPriceArgs {
                price_per_share,
                price_mint: self.price_mint,
                allowed_to_combine,
            },
        }
    }

    pub fn activate(&self, number_of_shares: u64) -> VaultInstruction {
        VaultInstruction::ActivateVault {
            accounts: ActivateVaultAccounts {
                vault: self.vault,
                fraction_mint: self.fraction_mint,
                fraction_treasury: self.fraction_treasury,
                vault_authority: self.authority,
            },
            args: NumberOfShareArgs { number_of_shares },
        }
    }

    pub fn mint_shares(&self, number_of_shares: u64) -> VaultInstruction {
        VaultInstruction::MintFractionalShares {
            accounts: MintFractionalSharesAccounts {
                fraction_treasury: self.fraction_treasury,
                fraction_mint: self.fraction_mint,
                vault: self.vault,
                vault_authority: self.authority,
            },
            args: NumberOfShareArgs { number_of_shares },
        }
    }

    pub fn withdraw_shares(&self, destination: Pubkey, number_of_shares: u64) -> VaultInstruction {
        VaultInstruction::WithdrawSharesFromTreasury {
            accounts: WithdrawSharesFromTreasuryAccounts {
                destination,
                fraction_treasury: self.fraction_treasury,
                vault: self.vault,
                vault_authority: self.authority,
            },
            args: NumberOfShareArgs { number_of_shares },
        }
    }

    pub fn add_shares(
        &self,
        source: Pubkey,
        transfer_authority: Pubkey,
        number_of_shares: u64,
    ) -> VaultInstruction {
        VaultInstruction::AddSharesToTreasury {
            accounts: AddSharesToTreasuryAccounts {
                source,
                fraction_treasury: self.fraction_treasury,
                vault: self.vault,
                transfer_authority,
                vault_authority: self.authority,
            },
            args: NumberOfShareArgs { number_of_shares },
        }
    }

    /// `holder` owns `outstanding_shares` and receives into `proceeds`.
    pub fn redeem(
        &self,
        outstanding_shares: Pubkey,
        proceeds: Pubkey,
        holder: Pubkey,
    ) -> VaultInstruction {
        VaultInstruction::RedeemShares {
            accounts: RedeemSharesAccounts {
                outstanding_shares,
                proceeds,
                fraction_mint: self.fraction_mint,
                redeem_treasury: self.redeem_treasury,
                transfer_authority: holder,
                vault: self.vault,
            },
        }
    }

    pub fn set_authority(&self, new_authority: Pubkey) -> VaultInstruction {
        VaultInstruction::SetAuthority {
            accounts: SetAuthorityAccounts {
                vault: self.vault,
                current_authority: self.authority,
                new_authority,
            },
        }
    }
}

/// Allocates and initializes a vault in one transaction.
pub fn init_vault<L>(
    ledger: &mut L,
    program: &VaultProgram,
    authority: Pubkey,
    allow_further_share_creation: bool,
) -> Result<(InitVaultSetup, TransactionReceipt), VaultError>
where
    L: LedgerService + Clone,
{
    let setup = InitVaultSetup::create(ledger, program, authority)?;
    let tx = Transaction::new()
        .add_all(setup.instructions(allow_further_share_creation))
        .sign(authority);
    let receipt = program.submit(ledger, &tx)?;
    Ok((setup, receipt))
}

/// [`init_vault`] followed by activation with `number_of_shares`.
pub fn init_and_activate_vault<L>(
    ledger: &mut L,
    program: &VaultProgram,
    authority: Pubkey,
    allow_further_share_creation: bool,
    number_of_shares: u64,
) -> Result<InitVaultSetup, VaultError>
where
    L: LedgerService + Clone,
{
    let (setup, _) = init_vault(ledger, program, authority, allow_further_share_creation)?;
    program.submit_instruction(ledger, setup.activate(number_of_shares), [authority])?;
    Ok(setup)
}
