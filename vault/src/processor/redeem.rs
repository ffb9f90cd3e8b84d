//! RedeemShares: after combine, a holder burns all of their shares and is
//! paid at the locked price out of the redeem treasury.

use tracing::info;

use super::{require_key, InvokeContext};
use crate::error::VaultError;
use crate::instruction::RedeemSharesAccounts;
use crate::ledger::LedgerService;
use crate::state::VaultState;

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &RedeemSharesAccounts,
) -> Result<(), VaultError> {
    ctx.require_signer(&accounts.transfer_authority, "share holder")?;
    let vault = ctx.ledger().vault(&accounts.vault)?;
    vault.require_state(VaultState::Combined)?;
    require_key(&vault.fraction_mint, &accounts.fraction_mint, "fraction mint")?;
    require_key(
        &vault.redeem_treasury,
        &accounts.redeem_treasury,
        "redeem treasury",
    )?;

    let holding = ctx.ledger().token_account(&accounts.outstanding_shares)?;
    if holding.mint != accounts.fraction_mint {
        return Err(VaultError::InvalidAccount(format!(
            "{} does not hold shares of this vault",
            accounts.outstanding_shares
        )));
    }
    if holding.amount == 0 {
        return Err(VaultError::InvalidAmount);
    }

    let payout = holding
        .amount
        .checked_mul(vault.locked_price_per_share)
        .ok_or(VaultError::AmountOverflow)?;

    let derived = ctx.derived_authority(&accounts.vault);
    ctx.burn(
        &accounts.outstanding_shares,
        &accounts.transfer_authority,
        holding.amount,
    )?;
    ctx.transfer(
        &accounts.redeem_treasury,
        &accounts.proceeds,
        &derived,
        payout,
    )?;

    info!(
        vault = %accounts.vault,
        holder = %accounts.transfer_authority,
        shares = holding.amount,
        payout,
        "shares redeemed"
    );
    Ok(())
}
