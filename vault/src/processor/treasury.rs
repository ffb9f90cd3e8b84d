//! Moving shares in and out of the fraction treasury while a vault is active.

use tracing::info;

use super::{require_key, InvokeContext};
use crate::error::VaultError;
use crate::instruction::{
    AddSharesToTreasuryAccounts, NumberOfShareArgs, WithdrawSharesFromTreasuryAccounts,
};
use crate::ledger::LedgerService;
use crate::state::VaultState;

/// WithdrawSharesFromTreasury: distributes treasury shares to a holder.
pub(crate) fn withdraw_shares<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &WithdrawSharesFromTreasuryAccounts,
    args: &NumberOfShareArgs,
) -> Result<(), VaultError> {
    let vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.vault_authority)?;
    vault.require_state(VaultState::Active)?;
    require_key(
        &vault.fraction_treasury,
        &accounts.fraction_treasury,
        "fraction treasury",
    )?;

    let derived = ctx.derived_authority(&accounts.vault);
    ctx.transfer(
        &accounts.fraction_treasury,
        &accounts.destination,
        &derived,
        args.number_of_shares,
    )?;

    info!(
        vault = %accounts.vault,
        destination = %accounts.destination,
        shares = args.number_of_shares,
        "shares withdrawn from treasury"
    );
    Ok(())
}

/// AddSharesToTreasury: returns a holder's shares to the treasury.
pub(crate) fn add_shares<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &AddSharesToTreasuryAccounts,
    args: &NumberOfShareArgs,
) -> Result<(), VaultError> {
    let vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.vault_authority)?;
    ctx.require_signer(&accounts.transfer_authority, "transfer authority")?;
    vault.require_state(VaultState::Active)?;
    require_key(
        &vault.fraction_treasury,
        &accounts.fraction_treasury,
        "fraction treasury",
    )?;

    ctx.transfer(
        &accounts.source,
        &accounts.fraction_treasury,
        &accounts.transfer_authority,
        args.number_of_shares,
    )?;

    info!(
        vault = %accounts.vault,
        source = %accounts.source,
        shares = args.number_of_shares,
        "shares added to treasury"
    );
    Ok(())
}
