//! AddTokenToInactiveVault: opens a safety deposit box and funds its store.

use tracing::info;

use super::InvokeContext;
use crate::error::VaultError;
use crate::instruction::{AddTokenToInactiveVaultAccounts, AmountArgs};
use crate::ledger::LedgerService;
use crate::pda;
use crate::state::{SafetyDepositBox, VaultState};

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &AddTokenToInactiveVaultAccounts,
    args: &AmountArgs,
) -> Result<(), VaultError> {
    let mut vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.vault_authority)?;
    ctx.require_signer(&accounts.transfer_authority, "transfer authority")?;
    vault.require_state(VaultState::Inactive)?;
    if args.amount == 0 {
        return Err(VaultError::InvalidAmount);
    }

    let source = ctx.ledger().token_account(&accounts.token_account)?;
    let token_mint = source.mint;

    let expected = pda::derive_safety_deposit(ctx.program_id(), &accounts.vault, &token_mint);
    if accounts.safety_deposit != expected {
        return Err(VaultError::InvalidAccount(format!(
            "safety deposit {} is not the derived box address {expected}",
            accounts.safety_deposit
        )));
    }
    if ctx.ledger().exists(&accounts.safety_deposit) {
        return Err(VaultError::DuplicateSafetyDeposit {
            vault: accounts.vault,
            token_mint,
        });
    }

    let derived = ctx.derived_authority(&accounts.vault);
    let store = ctx.ledger().token_account(&accounts.store)?;
    if store.mint != token_mint || store.owner != derived || store.amount != 0 {
        return Err(VaultError::InvalidAccount(format!(
            "store {} must be an empty {token_mint} account owned by {derived}",
            accounts.store
        )));
    }

    let order = vault.token_type_count;
    vault.token_type_count = vault
        .token_type_count
        .checked_add(1)
        .ok_or(VaultError::AmountOverflow)?;

    ctx.transfer(
        &accounts.token_account,
        &accounts.store,
        &accounts.transfer_authority,
        args.amount,
    )?;

    ctx.ledger_mut().put_safety_deposit(
        accounts.safety_deposit,
        SafetyDepositBox {
            vault: accounts.vault,
            token_mint,
            store: accounts.store,
            order,
            emptied: false,
        },
    )?;
    ctx.ledger_mut().put_vault(accounts.vault, vault)?;

    info!(
        vault = %accounts.vault,
        token_mint = %token_mint,
        amount = args.amount,
        order,
        "safety deposit box added"
    );
    Ok(())
}
