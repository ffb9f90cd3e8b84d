//! ActivateVault: issues the initial shares and locks the box set.

use tracing::info;

use super::{require_key, InvokeContext};
use crate::error::VaultError;
use crate::instruction::{ActivateVaultAccounts, NumberOfShareArgs};
use crate::ledger::LedgerService;
use crate::state::VaultState;

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &ActivateVaultAccounts,
    args: &NumberOfShareArgs,
) -> Result<(), VaultError> {
    let mut vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.vault_authority)?;
    vault.require_state(VaultState::Inactive)?;
    require_key(&vault.fraction_mint, &accounts.fraction_mint, "fraction mint")?;
    require_key(
        &vault.fraction_treasury,
        &accounts.fraction_treasury,
        "fraction treasury",
    )?;

    let derived = ctx.derived_authority(&accounts.vault);
    ctx.mint_to(
        &accounts.fraction_mint,
        &accounts.fraction_treasury,
        &derived,
        args.number_of_shares,
    )?;

    vault.state = VaultState::Active;
    ctx.ledger_mut().put_vault(accounts.vault, vault)?;

    info!(
        vault = %accounts.vault,
        shares = args.number_of_shares,
        "vault activated"
    );
    Ok(())
}
