//! UpdateExternalPriceAccount: creates or updates a buy-out price record.
//!
//! The first signer to write a record becomes its authority; later updates
//! must come from that authority.

use tracing::info;

use super::InvokeContext;
use crate::error::VaultError;
use crate::instruction::{ExternalPriceArgs, UpdateExternalPriceAccounts};
use crate::ledger::{LedgerError, LedgerService};
use crate::state::ExternalPriceAccount;

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &UpdateExternalPriceAccounts,
    args: &ExternalPriceArgs,
) -> Result<(), VaultError> {
    ctx.require_signer(&accounts.authority, "price authority")?;

    match ctx.ledger().external_price(&accounts.external_price_account) {
        Ok(existing) if existing.authority != accounts.authority => {
            return Err(VaultError::Unauthorized(format!(
                "{} is not the authority of price account {}",
                accounts.authority, accounts.external_price_account
            )));
        }
        Ok(_) | Err(LedgerError::AccountNotFound(_)) => {}
        Err(other) => return Err(other.into()),
    }

    // The price has to be denominated in something that exists.
    ctx.ledger().mint(&args.price_mint)?;

    ctx.ledger_mut().put_external_price(
        accounts.external_price_account,
        ExternalPriceAccount {
            authority: accounts.authority,
            price_per_share: args.price_per_share,
            price_mint: args.price_mint,
            allowed_to_combine: args.allowed_to_combine,
        },
    )?;

    info!(
        account = %accounts.external_price_account,
        price_per_share = args.price_per_share,
        allowed_to_combine = args.allowed_to_combine,
        "external price updated"
    );
    Ok(())
}
