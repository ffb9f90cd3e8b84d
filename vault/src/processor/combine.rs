//! # CombineVault
//!
//! Second phase of the buy-out. The vault authority has already staged two
//! accounts (see [`crate::client::CombineVaultSetup`]) and delegated both to
//! a short-lived transfer authority:
//!
//! - `your_outstanding_shares`: the authority's own fraction-mint holdings,
//! - `your_payment`: price-mint tokens covering everyone else's shares.
//!
//! With `outstanding = supply - treasury - authority_shares`, the authority
//! owes `outstanding * price_per_share`. Combining moves that payment into
//! the redeem treasury, burns the authority's shares and the treasury's
//! shares, and locks the price so remaining holders can redeem later.
//!
//! Either both staged transfers are covered by live approvals or the whole
//! instruction fails with [`VaultError::IncompleteSettlement`]. The supply
//! change here is part of the state transition and is not subject to
//! `allow_further_share_creation`.

use tracing::info;

use super::{require_key, InvokeContext};
use crate::error::VaultError;
use crate::instruction::CombineVaultAccounts;
use crate::ledger::{LedgerService, TokenAccount};
use crate::pubkey::Pubkey;
use crate::state::VaultState;

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &CombineVaultAccounts,
) -> Result<(), VaultError> {
    let mut vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.vault_authority)?;
    vault.require_state(VaultState::Active)?;
    ctx.require_signer(&accounts.transfer_authority, "transfer authority")?;

    require_key(&vault.fraction_mint, &accounts.fraction_mint, "fraction mint")?;
    require_key(
        &vault.fraction_treasury,
        &accounts.fraction_treasury,
        "fraction treasury",
    )?;
    require_key(
        &vault.redeem_treasury,
        &accounts.redeem_treasury,
        "redeem treasury",
    )?;
    require_key(
        &vault.pricing_lookup_address,
        &accounts.external_pricing,
        "external pricing",
    )?;

    let pricing = ctx.ledger().external_price(&accounts.external_pricing)?;
    if !pricing.allowed_to_combine {
        return Err(VaultError::NotCombinable(accounts.external_pricing));
    }
    let redeem_treasury = ctx.ledger().token_account(&accounts.redeem_treasury)?;
    if redeem_treasury.mint != pricing.price_mint {
        return Err(VaultError::InvalidAccount(format!(
            "redeem treasury holds {}, but the vault is priced in {}",
            redeem_treasury.mint, pricing.price_mint
        )));
    }

    let shares = ctx.ledger().token_account(&accounts.your_outstanding_shares)?;
    if shares.mint != accounts.fraction_mint {
        return Err(VaultError::InvalidAccount(format!(
            "outstanding shares account {} does not hold the fraction mint",
            accounts.your_outstanding_shares
        )));
    }
    let payment = ctx.ledger().token_account(&accounts.your_payment)?;
    if payment.mint != pricing.price_mint {
        return Err(VaultError::InvalidAccount(format!(
            "payment account {} does not hold the price mint {}",
            accounts.your_payment, pricing.price_mint
        )));
    }

    let supply = ctx.ledger().mint(&accounts.fraction_mint)?.supply;
    let treasury_shares = ctx
        .ledger()
        .token_account(&accounts.fraction_treasury)?
        .amount;
    let authority_shares = shares.amount;
    let outstanding = supply
        .checked_sub(treasury_shares)
        .and_then(|rest| rest.checked_sub(authority_shares))
        .ok_or(VaultError::AmountOverflow)?;
    let what_you_owe = outstanding
        .checked_mul(pricing.price_per_share)
        .ok_or(VaultError::AmountOverflow)?;

    let slot = ctx.ledger().slot();
    require_staged(
        &accounts.your_outstanding_shares,
        &shares,
        &accounts.transfer_authority,
        authority_shares,
        slot,
    )?;
    require_staged(
        &accounts.your_payment,
        &payment,
        &accounts.transfer_authority,
        what_you_owe,
        slot,
    )?;
    if payment.amount < what_you_owe {
        return Err(VaultError::IncompleteSettlement(format!(
            "payment account {} holds {}, but {what_you_owe} is owed",
            accounts.your_payment, payment.amount
        )));
    }

    let derived = ctx.derived_authority(&accounts.vault);
    ctx.transfer(
        &accounts.your_payment,
        &accounts.redeem_treasury,
        &accounts.transfer_authority,
        what_you_owe,
    )?;
    ctx.burn(
        &accounts.your_outstanding_shares,
        &accounts.transfer_authority,
        authority_shares,
    )?;
    ctx.burn(&accounts.fraction_treasury, &derived, treasury_shares)?;
    ctx.revoke(&accounts.your_outstanding_shares, &accounts.transfer_authority)?;
    ctx.revoke(&accounts.your_payment, &accounts.transfer_authority)?;

    vault.locked_price_per_share = pricing.price_per_share;
    vault.state = VaultState::Combined;
    ctx.ledger_mut().put_vault(accounts.vault, vault)?;

    info!(
        vault = %accounts.vault,
        price_per_share = pricing.price_per_share,
        outstanding,
        paid = what_you_owe,
        burned = authority_shares.saturating_add(treasury_shares),
        "vault combined"
    );
    Ok(())
}

/// Checks that `delegate` holds a live approval on `account` for `amount`.
fn require_staged(
    address: &Pubkey,
    account: &TokenAccount,
    delegate: &Pubkey,
    amount: u64,
    slot: u64,
) -> Result<(), VaultError> {
    let Some(delegation) = &account.delegate else {
        return Err(VaultError::IncompleteSettlement(format!(
            "no transfer approval on {address}"
        )));
    };
    if delegation.delegate != *delegate {
        return Err(VaultError::IncompleteSettlement(format!(
            "{address} is approved for {}, not the transfer authority {delegate}",
            delegation.delegate
        )));
    }
    if delegation.is_expired(slot) {
        return Err(VaultError::IncompleteSettlement(format!(
            "transfer approval on {address} expired at slot {}",
            delegation.expires_at_slot.unwrap_or_default()
        )));
    }
    if !delegation.covers(delegate, amount, slot) {
        return Err(VaultError::IncompleteSettlement(format!(
            "transfer approval on {address} covers {}, but {amount} is required",
            delegation.amount
        )));
    }
    Ok(())
}
