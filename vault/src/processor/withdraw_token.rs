//! WithdrawTokenFromSafetyDepositBox: pays custodied tokens out of a
//! combined vault.
//!
//! The first withdrawal that empties a store flags the box as emptied, and
//! `token_type_count` follows the configured [`TokenTypeCountPolicy`]. Afterwards the deactivation rule is
//! applied: no token types left and no shares outstanding retires the vault.

use tracing::info;

use super::{require_key, InvokeContext};
use crate::config::TokenTypeCountPolicy;
use crate::error::VaultError;
use crate::instruction::{AmountArgs, WithdrawTokenFromSafetyDepositBoxAccounts};
use crate::ledger::LedgerService;
use crate::state::VaultState;

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &WithdrawTokenFromSafetyDepositBoxAccounts,
    args: &AmountArgs,
) -> Result<(), VaultError> {
    let mut vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.vault_authority)?;
    vault.require_state(VaultState::Combined)?;
    require_key(&vault.fraction_mint, &accounts.fraction_mint, "fraction mint")?;

    let mut safety_deposit = ctx.ledger().safety_deposit(&accounts.safety_deposit)?;
    require_key(&accounts.vault, &safety_deposit.vault, "safety deposit vault")?;
    require_key(&safety_deposit.store, &accounts.store, "store")?;
    if accounts.destination == accounts.store {
        return Err(VaultError::InvalidAccount(format!(
            "destination {} is the box's own store",
            accounts.destination
        )));
    }

    if args.amount == 0 {
        return Err(VaultError::InvalidAmount);
    }

    let store = ctx.ledger().token_account(&accounts.store)?;
    if args.amount > store.amount {
        return Err(VaultError::InsufficientBalance {
            requested: args.amount,
            available: store.amount,
        });
    }

    let derived = ctx.derived_authority(&accounts.vault);
    ctx.transfer(&accounts.store, &accounts.destination, &derived, args.amount)?;
    let remaining = ctx.ledger().token_account(&accounts.store)?.amount;

    // A box leaves the count once; refilling its store does not bring it back.
    if remaining == 0 && !safety_deposit.emptied {
        safety_deposit.emptied = true;
        if ctx.config().token_type_count_policy == TokenTypeCountPolicy::DecrementOnEmpty {
            vault.token_type_count = vault
                .token_type_count
                .checked_sub(1)
                .ok_or(VaultError::AmountOverflow)?;
        }
        ctx.ledger_mut()
            .put_safety_deposit(accounts.safety_deposit, safety_deposit)?;
    }

    let supply = ctx.ledger().mint(&vault.fraction_mint)?.supply;
    let deactivated = vault.deactivate_if_empty(supply);
    let token_type_count = vault.token_type_count;
    ctx.ledger_mut().put_vault(accounts.vault, vault)?;

    info!(
        vault = %accounts.vault,
        store = %accounts.store,
        amount = args.amount,
        remaining,
        token_type_count,
        deactivated,
        "tokens withdrawn from safety deposit box"
    );
    Ok(())
}
