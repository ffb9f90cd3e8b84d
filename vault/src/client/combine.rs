//! # Combine Staging
//!
//! First phase of the buy-out. [`CombineVaultSetup`] walks the vault
//! authority through:
//!
//! 1. [`create_outstanding_shares`](CombineVaultSetup::create_outstanding_shares):
//!    a fraction-mint account for the authority's own shares,
//! 2. [`create_payment`](CombineVaultSetup::create_payment): a price-mint
//!    account the authority funds with what it owes,
//! 3. [`approve_transfers`](CombineVaultSetup::approve_transfers): delegates
//!    both accounts to a fresh transfer authority until `slot + ttl`,
//! 4. [`assert_complete`](CombineVaultSetup::assert_complete): hands back the
//!    staged [`CombineSettlement`] or names the missing step.
//!
//! Amounts are computed against the ledger at approval time. Activation
//! shares land in the treasury, which is excluded from what is owed, so a
//! vault can be staged before it is activated and combined in the same
//! transaction as its activation.

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::instruction::{CombineVaultAccounts, Transaction, VaultInstruction};
use crate::ledger::{Delegation, LedgerService};
use crate::processor::{TransactionReceipt, VaultProgram};
use crate::pubkey::Pubkey;

use super::InitVaultSetup;

/// A fully staged settlement, ready to be consumed by `CombineVault`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineSettlement {
    pub your_outstanding_shares: Pubkey,
    pub your_payment: Pubkey,
    pub transfer_authority: Pubkey,
    pub external_pricing: Pubkey,
    /// Shares the transfer authority may burn.
    pub outstanding_shares_amount: u64,
    /// Price-mint tokens the transfer authority may move.
    pub payment_amount: u64,
    /// Last slot the approvals are honoured.
    pub expires_at_slot: u64,
}

/// Staging state for a combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineVaultSetup {
    vault: InitVaultSetup,
    ttl_slots: u64,
    transfer_authority: Pubkey,
    your_outstanding_shares: Option<Pubkey>,
    your_payment: Option<Pubkey>,
    approved: Option<(u64, u64, u64)>,
}

impl CombineVaultSetup {
    /// Starts staging a combine of `vault` with a fresh transfer authority.
    pub fn new(vault: &InitVaultSetup, ttl_slots: u64) -> Self {
        Self {
            vault: vault.clone(),
            ttl_slots,
            transfer_authority: Pubkey::new_unique(),
            your_outstanding_shares: None,
            your_payment: None,
            approved: None,
        }
    }

    pub fn transfer_authority(&self) -> Pubkey {
        self.transfer_authority
    }

    pub fn your_outstanding_shares(&self) -> Option<Pubkey> {
        self.your_outstanding_shares
    }

    pub fn your_payment(&self) -> Option<Pubkey> {
        self.your_payment
    }

    /// Allocates the authority's fraction-mint account.
    pub fn create_outstanding_shares<L: LedgerService>(
        &mut self,
        ledger: &mut L,
    ) -> Result<Pubkey, VaultError> {
        let address = Pubkey::new_unique();
        ledger.create_token_account(address, self.vault.fraction_mint, self.vault.authority)?;
        self.your_outstanding_shares = Some(address);
        Ok(address)
    }

    /// Allocates the authority's price-mint account.
    pub fn create_payment<L: LedgerService>(&mut self, ledger: &mut L) -> Result<Pubkey, VaultError> {
        let address = Pubkey::new_unique();
        ledger.create_token_account(address, self.vault.price_mint, self.vault.authority)?;
        self.your_payment = Some(address);
        Ok(address)
    }

    /// The (authority shares, payment) amounts combine will require right now.
    pub fn required_amounts<L: LedgerService>(&self, ledger: &L) -> Result<(u64, u64), VaultError> {
        let (shares_account, _) = self.staged_accounts()?;
        let authority_shares = ledger.token_account(&shares_account)?.amount;
        let supply = ledger.mint(&self.vault.fraction_mint)?.supply;
        let treasury = ledger.token_account(&self.vault.fraction_treasury)?.amount;
        let price = ledger
            .external_price(&self.vault.pricing_lookup_address)?
            .price_per_share;

        let outstanding = supply
            .checked_sub(treasury)
            .and_then(|rest| rest.checked_sub(authority_shares))
            .ok_or(VaultError::AmountOverflow)?;
        let owed = outstanding
            .checked_mul(price)
            .ok_or(VaultError::AmountOverflow)?;
        Ok((authority_shares, owed))
    }

    /// Delegates both staged accounts to the transfer authority.
    pub fn approve_transfers<L: LedgerService>(&mut self, ledger: &mut L) -> Result<(), VaultError> {
        let (shares_account, payment_account) = self.staged_accounts()?;
        let (shares, owed) = self.required_amounts(ledger)?;
        let expires_at_slot = ledger.slot().saturating_add(self.ttl_slots);

        for (account, amount) in [(shares_account, shares), (payment_account, owed)] {
            ledger.approve(
                &account,
                &self.vault.authority,
                Delegation {
                    delegate: self.transfer_authority,
                    amount,
                    expires_at_slot: Some(expires_at_slot),
                },
            )?;
        }
        self.approved = Some((shares, owed, expires_at_slot));
        Ok(())
    }

    /// Returns the staged settlement, or what is still missing.
    pub fn assert_complete(&self) -> Result<CombineSettlement, VaultError> {
        let (your_outstanding_shares, your_payment) = self.staged_accounts()?;
        let Some((outstanding_shares_amount, payment_amount, expires_at_slot)) = self.approved
        else {
            return Err(VaultError::IncompleteSettlement(
                "transfers have not been approved".into(),
            ));
        };
        Ok(CombineSettlement {
            your_outstanding_shares,
            your_payment,
            transfer_authority: self.transfer_authority,
            external_pricing: self.vault.pricing_lookup_address,
            outstanding_shares_amount,
            payment_amount,
            expires_at_slot,
        })
    }

    /// The `CombineVault` instruction consuming this settlement.
    pub fn instruction(&self) -> Result<VaultInstruction, VaultError> {
        let settlement = self.assert_complete()?;
        Ok(VaultInstruction::CombineVault {
            accounts: CombineVaultAccounts {
                vault: self.vault.vault,
                your_outstanding_shares: settlement.your_outstanding_shares,
                your_payment: settlement.your_payment,
                fraction_mint: self.vault.fraction_mint,
                fraction_treasury: self.vault.fraction_treasury,
                redeem_treasury: self.vault.redeem_treasury,
                vault_authority: self.vault.authority,
                transfer_authority: self.transfer_authority,
                external_pricing: settlement.external_pricing,
            },
        })
    }

    fn staged_accounts(&self) -> Result<(Pubkey, Pubkey), VaultError> {
        let shares = self.your_outstanding_shares.ok_or_else(|| {
            VaultError::IncompleteSettlement("outstanding shares account not created".into())
        })?;
        let payment = self.your_payment.ok_or_else(|| {
            VaultError::IncompleteSettlement("payment account not created".into())
        })?;
        Ok((shares, payment))
    }
}

/// Activates `vault` with `number_of_shares` and combines it in a single
/// transaction, staging the settlement first.
pub fn activate_and_combine_vault<L>(
    ledger: &mut L,
    program: &VaultProgram,
    vault: &InitVaultSetup,
    number_of_shares: u64,
) -> Result<TransactionReceipt, VaultError>
where
    L: LedgerService + Clone,
{
    let mut setup = CombineVaultSetup::new(vault, program.config().transfer_authority_ttl_slots);
    setup.create_outstanding_shares(ledger)?;
    setup.create_payment(ledger)?;
    setup.approve_transfers(ledger)?;

    let tx = Transaction::new()
        .add(vault.activate(number_of_shares))
        .add(setup.instruction()?)
        .sign(vault.authority)
        .sign(setup.transfer_authority());
    program.submit(ledger, &tx)
}

/// Combines an already active vault with a staged settlement.
pub fn combine_vault<L>(
    ledger: &mut L,
    program: &VaultProgram,
    setup: &CombineVaultSetup,
) -> Result<TransactionReceipt, VaultError>
where
    L: LedgerService + Clone,
{
    let tx = Transaction::new()
        .add(setup.instruction()?)
        .sign(setup.vault.authority)
        .sign(setup.transfer_authority);
    program.submit(ledger, &tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::init_and_activate_vault;
    use crate::ledger::InMemoryLedger;

    fn staged(shares: u64) -> (InMemoryLedger, InitVaultSetup, CombineVaultSetup) {
        let program = VaultProgram::default();
        let mut ledger = InMemoryLedger::new();
        let vault =
            init_and_activate_vault(&mut ledger, &program, Pubkey::new_unique(), true, shares)
                .unwrap();
        let setup = CombineVaultSetup::new(&vault, 10);
        (ledger, vault, setup)
    }

    #[test]
    fn assert_complete_names_the_missing_step() {
        let (mut ledger, _, mut setup) = staged(0);

        let err = setup.assert_complete().unwrap_err();
        assert!(err.to_string().contains("outstanding shares account"));

        setup.create_outstanding_shares(&mut ledger).unwrap();
        let err = setup.assert_complete().unwrap_err();
        assert!(err.to_string().contains("payment account"));

        setup.create_payment(&mut ledger).unwrap();
        let err = setup.assert_complete().unwrap_err();
        assert!(err.to_string().contains("not been approved"));
        assert!(setup.instruction().is_err());

        setup.approve_transfers(&mut ledger).unwrap();
        let settlement = setup.assert_complete().unwrap();
        assert_eq!(settlement.transfer_authority, setup.transfer_authority());
        assert_eq!(settlement.expires_at_slot, ledger.slot() + 10);
    }

    #[test]
    fn approvals_cover_the_required_amounts() {
        let (mut ledger, vault, mut setup) = staged(100);
        let derived = VaultProgram::default().derived_authority(&vault.vault);
        let shares = setup.create_outstanding_shares(&mut ledger).unwrap();
        let payment = setup.create_payment(&mut ledger).unwrap();

        // 30 shares leave the treasury, 5 of them to the authority itself.
        let holder = Pubkey::new_unique();
        ledger
            .create_token_account(holder, vault.fraction_mint, Pubkey::new_unique())
            .unwrap();
        ledger
            .transfer(&vault.fraction_treasury, &holder, &derived, 25)
            .unwrap();
        ledger
            .transfer(&vault.fraction_treasury, &shares, &derived, 5)
            .unwrap();
        let mut price = ledger.external_price(&vault.pricing_lookup_address).unwrap();
        price.price_per_share = 4;
        ledger
            .put_external_price(vault.pricing_lookup_address, price)
            .unwrap();

        assert_eq!(setup.required_amounts(&ledger).unwrap(), (5, 100));

        setup.approve_transfers(&mut ledger).unwrap();
        let delegation = ledger.token_account(&payment).unwrap().delegate.unwrap();
        assert_eq!(delegation.delegate, setup.transfer_authority());
        assert_eq!(delegation.amount, 100);
        let settlement = setup.assert_complete().unwrap();
        assert_eq!(settlement.outstanding_shares_amount, 5);
        assert_eq!(settlement.payment_amount, 100);
    }
}
