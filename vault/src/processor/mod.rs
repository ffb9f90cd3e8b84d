//! # Vault Program
//!
//! The reconstructed on-chain program: a pure state-transition function from
//! (ledger, transaction) to (ledger', receipt). It owns no state of its own.
//!
//! ```text
//! mod.rs             - VaultProgram, submit/dispatch, receipts
//! context.rs         - per-transaction invocation context (signers, logs, balances)
//! init_vault.rs      - InitVault
//! add_token.rs       - AddTokenToInactiveVault
//! activate.rs        - ActivateVault
//! combine.rs         - CombineVault
//! mint_shares.rs     - MintFractionalShares
//! withdraw_token.rs  - WithdrawTokenFromSafetyDepositBox
//! treasury.rs        - WithdrawSharesFromTreasury / AddSharesToTreasury
//! redeem.rs          - RedeemShares
//! external_price.rs  - UpdateExternalPriceAccount
//! set_authority.rs   - SetAuthority
//! ```
//!
//! ## Atomicity
//!
//! [`VaultProgram::submit`] runs every instruction of a transaction against a
//! clone of the ledger. Only when all of them succeed is the clone written
//! back and the slot advanced; on the first failure the clone is dropped and
//! the caller's ledger is exactly as it was.

mod activate;
mod add_token;
mod combine;
mod context;
mod external_price;
mod init_vault;
mod mint_shares;
mod redeem;
mod set_authority;
mod treasury;
mod withdraw_token;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DeactivationCheck, VaultConfig, PROGRAM_ID};
use crate::error::VaultError;
use crate::instruction::{Transaction, VaultInstruction};
use crate::ledger::LedgerService;
use crate::pda;
use crate::pubkey::Pubkey;

pub(crate) use context::InvokeContext;

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Balance of one token account before and after a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalanceChange {
    /// The token account.
    pub account: Pubkey,
    /// Its token type.
    pub mint: Pubkey,
    /// Its owner.
    pub owner: Pubkey,
    /// Balance before the transaction.
    pub pre: u64,
    /// Balance after the transaction.
    pub post: u64,
}

/// Outcome of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Slot the transaction was committed in.
    pub slot: u64,
    /// Program log lines, in emission order.
    pub logs: Vec<String>,
    /// Every token account the transaction touched, in address order.
    pub token_balances: Vec<TokenBalanceChange>,
}

impl TransactionReceipt {
    /// Returns `true` if some log line contains `needle`, ignoring case.
    pub fn logs_contain(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.logs
            .iter()
            .any(|line| line.to_lowercase().contains(&needle))
    }

    /// Balance change of a specific token account.
    pub fn balance_change(&self, account: &Pubkey) -> Option<&TokenBalanceChange> {
        self.token_balances.iter().find(|c| c.account == *account)
    }

    /// Balance change of the first touched account with this mint and owner.
    pub fn balance_for(&self, mint: &Pubkey, owner: &Pubkey) -> Option<&TokenBalanceChange> {
        self.token_balances
            .iter()
            .find(|c| c.mint == *mint && c.owner == *owner)
    }
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

/// The vault program, parameterised by its id and policy config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultProgram {
    program_id: Pubkey,
    config: VaultConfig,
}

impl Default for VaultProgram {
    fn default() -> Self {
        Self::new(VaultConfig::default())
    }
}

impl VaultProgram {
    /// Creates the program at the canonical [`PROGRAM_ID`].
    pub fn new(config: VaultConfig) -> Self {
        Self::with_program_id(PROGRAM_ID, config)
    }

    /// Creates the program at a custom id. Derived addresses change with it.
    pub fn with_program_id(program_id: Pubkey, config: VaultConfig) -> Self {
        Self { program_id, config }
    }

    /// Address the program runs at.
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Policy knobs in effect.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The derived transfer/mint authority of `vault`.
    pub fn derived_authority(&self, vault: &Pubkey) -> Pubkey {
        pda::derive_authority(&self.program_id, vault)
    }

    /// The address a safety deposit box for `token_mint` must live at.
    pub fn safety_deposit_address(&self, vault: &Pubkey, token_mint: &Pubkey) -> Pubkey {
        pda::derive_safety_deposit(&self.program_id, vault, token_mint)
    }

    /// Executes `tx` atomically against `ledger`.
    ///
    /// # Errors
    ///
    /// Returns the first instruction failure. The ledger is left untouched
    /// in that case.
    pub fn submit<L>(&self, ledger: &mut L, tx: &Transaction) -> Result<TransactionReceipt, VaultError>
    where
        L: LedgerService + Clone,
    {
        let mut working = ledger.clone();
        let mut ctx = InvokeContext::new(&mut working, self.program_id, &self.config, &tx.signers);

        for (index, instruction) in tx.instructions.iter().enumerate() {
            if let Err(err) = self.process(&mut ctx, instruction) {
                warn!(
                    index,
                    instruction = instruction.name(),
                    kind = %err.kind(),
                    error = %err,
                    "transaction rejected"
                );
                return Err(err);
            }
        }

        let (logs, token_balances) = ctx.finish()?;
        working.advance_slots(1);
        let slot = working.slot();
        *ledger = working;

        debug!(slot, instructions = tx.instructions.len(), "transaction committed");
        Ok(TransactionReceipt {
            slot,
            logs,
            token_balances,
        })
    }

    /// Convenience for a single instruction.
    pub fn submit_instruction<L>(
        &self,
        ledger: &mut L,
        instruction: VaultInstruction,
        signers: impl IntoIterator<Item = Pubkey>,
    ) -> Result<TransactionReceipt, VaultError>
    where
        L: LedgerService + Clone,
    {
        let tx = Transaction::new().add(instruction).sign_all(signers);
        self.submit(ledger, &tx)
    }

    fn process<L: LedgerService>(
        &self,
        ctx: &mut InvokeContext<'_, L>,
        instruction: &VaultInstruction,
    ) -> Result<(), VaultError> {
        ctx.log(format!("Instruction: {}", instruction.name()));

        match instruction {
            VaultInstruction::InitVault { accounts, args } => {
                init_vault::process(ctx, accounts, args)?
            }
            VaultInstruction::AddTokenToInactiveVault { accounts, args } => {
                add_token::process(ctx, accounts, args)?
            }
            VaultInstruction::ActivateVault { accounts, args } => {
                activate::process(ctx, accounts, args)?
            }
            VaultInstruction::CombineVault { accounts } => combine::process(ctx, accounts)?,
            VaultInstruction::MintFractionalShares { accounts, args } => {
                mint_shares::process(ctx, accounts, args)?
            }
            VaultInstruction::WithdrawTokenFromSafetyDepositBox { accounts, args } => {
                withdraw_token::process(ctx, accounts, args)?
            }
            VaultInstruction::WithdrawSharesFromTreasury { accounts, args } => {
                treasury::withdraw_shares(ctx, accounts, args)?
            }
            VaultInstruction::AddSharesToTreasury { accounts, args } => {
                treasury::add_shares(ctx, accounts, args)?
            }
            VaultInstruction::RedeemShares { accounts } => redeem::process(ctx, accounts)?,
            VaultInstruction::UpdateExternalPriceAccount { accounts, args } => {
                external_price::process(ctx, accounts, args)?
            }
            VaultInstruction::SetAuthority { accounts } => set_authority::process(ctx, accounts)?,
        }

        if self.config.deactivation_check == DeactivationCheck::EveryMutation {
            if let Some(vault) = instruction.vault() {
                recheck_deactivation(ctx, vault)?;
            }
        }

        ctx.log(format!("Program {} success", self.program_id));
        Ok(())
    }
}

/// Re-applies the deactivation rule to `address` after a mutation.
fn recheck_deactivation<L: LedgerService>(
    ctx: &mut InvokeContext<'_, L>,
    address: &Pubkey,
) -> Result<(), VaultError> {
    let mut vault = ctx.ledger().vault(address)?;
    let supply = ctx.ledger().mint(&vault.fraction_mint)?.supply;
    if vault.deactivate_if_empty(supply) {
        info!(vault = %address, "vault deactivated after mutation");
        ctx.ledger_mut().put_vault(*address, vault)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared checks
// ---------------------------------------------------------------------------

/// Fails unless `account` is the record the vault points at.
pub(crate) fn require_key(expected: &Pubkey, account: &Pubkey, role: &str) -> Result<(), VaultError> {
    if expected != account {
        return Err(VaultError::InvalidAccount(format!(
            "{role} {account} does not belong to this vault (expected {expected})"
        )));
    }
    Ok(())
}
