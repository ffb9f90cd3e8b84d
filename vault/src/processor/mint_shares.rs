//! MintFractionalShares: treasury minting after activation.
//!
//! Gated by `allow_further_share_creation`, except that minting zero shares
//! is always a valid no-op on an active vault.

use tracing::info;

use super::{require_key, InvokeContext};
use crate::error::VaultError;
use crate::instruction::{MintFractionalSharesAccounts, NumberOfShareArgs};
use crate::ledger::LedgerService;
use crate::state::VaultState;

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &MintFractionalSharesAccounts,
    args: &NumberOfShareArgs,
) -> Result<(), VaultError> {
    let vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.vault_authority)?;
    vault.require_state(VaultState::Active)?;
    require_key(&vault.fraction_mint, &accounts.fraction_mint, "fraction mint")?;
    require_key(
        &vault.fraction_treasury,
        &accounts.fraction_treasury,
        "fraction treasury",
    )?;

    if !vault.allow_further_share_creation && args.number_of_shares > 0 {
        return Err(VaultError::SharesLocked);
    }

    let derived = ctx.derived_authority(&accounts.vault);
    ctx.mint_to(
        &accounts.fraction_mint,
        &accounts.fraction_treasury,
        &derived,
        args.number_of_shares,
    )?;

    info!(
        vault = %accounts.vault,
        shares = args.number_of_shares,
        "fractional shares minted to treasury"
    );
    Ok(())
}
