//! Safety deposit box setup and withdrawal helpers.

use crate::error::VaultError;
use crate::instruction::{
    AddTokenToInactiveVaultAccounts, AmountArgs, VaultInstruction,
    WithdrawTokenFromSafetyDepositBoxAccounts,
};
use crate::ledger::{Delegation, LedgerService};
use crate::processor::{TransactionReceipt, VaultProgram};
use crate::pubkey::Pubkey;

use super::InitVaultSetup;

/// A token type ready to be deposited into an inactive vault.
///
/// [`create`](Self::create) mints `mint_amount` tokens of a fresh mint into
/// a source account, allocates the store owned by the vault's derived
/// authority, and approves `transfer_authority` to move the deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyDepositSetup {
    pub vault: Pubkey,
    pub token_mint: Pubkey,
    /// Source of the deposit.
    pub token_account: Pubkey,
    pub store: Pubkey,
    /// Derived box address.
    pub safety_deposit: Pubkey,
    /// Delegate approved on `token_account`; signs the deposit.
    pub transfer_authority: Pubkey,
    pub mint_amount: u64,
}

impl SafetyDepositSetup {
    pub fn create<L: LedgerService>(
        ledger: &mut L,
        program: &VaultProgram,
        vault: &InitVaultSetup,
        mint_amount: u64,
    ) -> Result<Self, VaultError> {
        let token_mint = Pubkey::new_unique();
        let mint_authority = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let token_account = Pubkey::new_unique();
        let store = Pubkey::new_unique();
        let transfer_authority = Pubkey::new_unique();

        ledger.create_mint(token_mint, mint_authority, 0)?;
        ledger.create_token_account(token_account, token_mint, owner)?;
        ledger.mint_to(&token_mint, &token_account, &mint_authority, mint_amount)?;
        ledger.create_token_account(store, token_mint, vault.fraction_mint_authority)?;
        ledger.approve(
            &token_account,
            &owner,
            Delegation {
                delegate: transfer_authority,
                amount: mint_amount,
                expires_at_slot: None,
            },
        )?;

        Ok(Self {
            vault: vault.vault,
            token_mint,
            token_account,
            store,
            safety_deposit: program.safety_deposit_address(&vault.vault, &token_mint),
            transfer_authority,
            mint_amount,
        })
    }

    /// `AddTokenToInactiveVault` for the full minted amount.
    pub fn instruction(&self, vault_authority: Pubkey) -> VaultInstruction {
        VaultInstruction::AddTokenToInactiveVault {
            accounts: AddTokenToInactiveVaultAccounts {
                safety_deposit: self.safety_deposit,
                token_account: self.token_account,
                store: self.store,
                vault: self.vault,
                vault_authority,
                transfer_authority: self.transfer_authority,
            },
            args: AmountArgs {
                amount: self.mint_amount,
            },
        }
    }

    /// `WithdrawTokenFromSafetyDepositBox` from this box into `destination`.
    pub fn withdraw(
        &self,
        vault: &InitVaultSetup,
        destination: Pubkey,
        amount: u64,
    ) -> VaultInstruction {
        VaultInstruction::WithdrawTokenFromSafetyDepositBox {
            accounts: WithdrawTokenFromSafetyDepositBoxAccounts {
                destination,
                safety_deposit: self.safety_deposit,
                store: self.store,
                vault: self.vault,
                fraction_mint: vault.fraction_mint,
                vault_authority: vault.authority,
            },
            args: AmountArgs { amount },
        }
    }
}

/// Creates a token type with `mint_amount` supply and deposits all of it.
pub fn add_safety_deposit<L>(
    ledger: &mut L,
    program: &VaultProgram,
    vault: &InitVaultSetup,
    mint_amount: u64,
) -> Result<SafetyDepositSetup, VaultError>
where
    L: LedgerService + Clone,
{
    let setup = SafetyDepositSetup::create(ledger, program, vault, mint_amount)?;
    program.submit_instruction(
        ledger,
        setup.instruction(vault.authority),
        [vault.authority, setup.transfer_authority],
    )?;
    Ok(setup)
}

/// Allocates an empty `mint` account for a fresh owner to withdraw into.
pub fn setup_withdraw_destination<L: LedgerService>(
    ledger: &mut L,
    mint: Pubkey,
) -> Result<Pubkey, VaultError> {
    let destination = Pubkey::new_unique();
    ledger.create_token_account(destination, mint, Pubkey::new_unique())?;
    Ok(destination)
}

/// Withdraws `amount` from `deposit` into a freshly allocated destination.
pub fn withdraw_to_new_destination<L>(
    ledger: &mut L,
    program: &VaultProgram,
    vault: &InitVaultSetup,
    deposit: &SafetyDepositSetup,
    amount: u64,
) -> Result<(Pubkey, TransactionReceipt), VaultError>
where
    L: LedgerService + Clone,
{
    let destination = setup_withdraw_destination(ledger, deposit.token_mint)?;
    let receipt = program.submit_instruction(
        ledger,
        deposit.withdraw(vault, destination, amount),
        [vault.authority],
    )?;
    Ok((destination, receipt))
}
