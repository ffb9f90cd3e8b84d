//! InitVault: binds a fresh fraction mint and two treasuries to a new vault.

use tracing::info;

use super::InvokeContext;
use crate::error::VaultError;
use crate::instruction::{InitVaultAccounts, InitVaultArgs};
use crate::ledger::{LedgerError, LedgerService};
use crate::state::{Vault, VaultState};

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &InitVaultAccounts,
    args: &InitVaultArgs,
) -> Result<(), VaultError> {
    ctx.require_signer(&accounts.authority, "vault authority")?;

    match ctx.ledger().vault(&accounts.vault) {
        Ok(_) => return Err(VaultError::AlreadyInitialized(accounts.vault)),
        Err(LedgerError::AccountNotFound(_)) => {}
        Err(other) => return Err(other.into()),
    }

    let derived = ctx.derived_authority(&accounts.vault);

    let fraction_mint = ctx.ledger().mint(&accounts.fraction_mint)?;
    if fraction_mint.mint_authority != Some(derived) {
        return Err(VaultError::InvalidAccount(format!(
            "fraction mint {} must have the vault's derived authority {derived} as mint authority",
            accounts.fraction_mint
        )));
    }
    if fraction_mint.supply != 0 {
        return Err(VaultError::InvalidAccount(format!(
            "fraction mint {} already has supply {}",
            accounts.fraction_mint, fraction_mint.supply
        )));
    }

    let fraction_treasury = ctx.ledger().token_account(&accounts.fraction_treasury)?;
    if fraction_treasury.mint != accounts.fraction_mint
        || fraction_treasury.owner != derived
        || fraction_treasury.amount != 0
    {
        return Err(VaultError::InvalidAccount(format!(
            "fraction treasury {} must be an empty fraction-mint account owned by {derived}",
            accounts.fraction_treasury
        )));
    }

    let pricing = ctx.ledger().external_price(&accounts.pricing_lookup_address)?;
    let redeem_treasury = ctx.ledger().token_account(&accounts.redeem_treasury)?;
    if redeem_treasury.mint != pricing.price_mint
        || redeem_treasury.owner != derived
        || redeem_treasury.amount != 0
    {
        return Err(VaultError::InvalidAccount(format!(
            "redeem treasury {} must be an empty price-mint account owned by {derived}",
            accounts.redeem_treasury
        )));
    }

    let vault = Vault {
        fraction_mint: accounts.fraction_mint,
        authority: accounts.authority,
        fraction_treasury: accounts.fraction_treasury,
        redeem_treasury: accounts.redeem_treasury,
        allow_further_share_creation: args.allow_further_share_creation,
        pricing_lookup_address: accounts.pricing_lookup_address,
        token_type_count: 0,
        state: VaultState::Inactive,
        locked_price_per_share: 0,
    };
    ctx.ledger_mut().put_vault(accounts.vault, vault)?;

    info!(
        vault = %accounts.vault,
        authority = %accounts.authority,
        allow_further_share_creation = args.allow_further_share_creation,
        "vault initialized"
    );
    Ok(())
}
