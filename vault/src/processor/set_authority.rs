//! SetAuthority: hands the vault to a new authority.

use tracing::info;

use super::InvokeContext;
use crate::error::VaultError;
use crate::instruction::SetAuthorityAccounts;
use crate::ledger::LedgerService;
use crate::state::VaultState;

pub(crate) fn process<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    accounts: &SetAuthorityAccounts,
) -> Result<(), VaultError> {
    let mut vault = ctx.ledger().vault(&accounts.vault)?;
    ctx.require_vault_authority(&vault, &accounts.current_authority)?;
    if vault.state == VaultState::Deactivated {
        return Err(VaultError::InvalidState {
            current: vault.state,
            expected: "Inactive, Active or Combined".into(),
        });
    }

    vault.authority = accounts.new_authority;
    ctx.ledger_mut().put_vault(accounts.vault, vault)?;

    info!(
        vault = %accounts.vault,
        from = %accounts.current_authority,
        to = %accounts.new_authority,
        "vault authority changed"
    );
    Ok(())
}
