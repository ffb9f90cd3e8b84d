//! Per-transaction invocation context.
//!
//! Wraps the working copy of the ledger with what every instruction needs:
//! the signer set, the program log, and first-touch snapshots of token
//! balances so the receipt can report pre/post amounts.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::TokenBalanceChange;
use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::ledger::LedgerService;
use crate::pda;
use crate::pubkey::Pubkey;
use crate::state::Vault;

/// Balance snapshot taken the first time a transaction touches an account.
struct PreBalance {
    mint: Pubkey,
    owner: Pubkey,
    amount: u64,
}

pub(crate) struct InvokeContext<'a, L> {
    ledger: &'a mut L,
    program_id: Pubkey,
    config: &'a VaultConfig,
    signers: &'a BTreeSet<Pubkey>,
    logs: Vec<String>,
    touched: BTreeMap<Pubkey, PreBalance>,
}

impl<'a, L: LedgerService> InvokeContext<'a, L> {
    pub(crate) fn new(
        ledger: &'a mut L,
        program_id: Pubkey,
        config: &'a VaultConfig,
        signers: &'a BTreeSet<Pubkey>,
    ) -> Self {
        Self {
            ledger,
            program_id,
            config,
            signers,
            logs: Vec::new(),
            touched: BTreeMap::new(),
        }
    }

    pub(crate) fn ledger(&self) -> &L {
        &*self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut L {
        &mut *self.ledger
    }

    pub(crate) fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub(crate) fn config(&self) -> &VaultConfig {
        self.config
    }

    pub(crate) fn derived_authority(&self, vault: &Pubkey) -> Pubkey {
        pda::derive_authority(&self.program_id, vault)
    }

    pub(crate) fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(log = %line, "program log");
        self.logs.push(line);
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    /// Fails with [`VaultError::Unauthorized`] unless `key` signed.
    pub(crate) fn require_signer(&self, key: &Pubkey, role: &str) -> Result<(), VaultError> {
        if !self.signers.contains(key) {
            return Err(VaultError::Unauthorized(format!("{role} {key} did not sign")));
        }
        Ok(())
    }

    /// Fails unless `signer` is the vault's authority and signed.
    pub(crate) fn require_vault_authority(
        &self,
        vault: &Vault,
        signer: &Pubkey,
    ) -> Result<(), VaultError> {
        if vault.authority != *signer {
            return Err(VaultError::Unauthorized(format!(
                "{signer} is not the vault authority"
            )));
        }
        self.require_signer(signer, "vault authority")
    }

    // -----------------------------------------------------------------------
    // Token movements
    // -----------------------------------------------------------------------

    fn touch(&mut self, account: &Pubkey) -> Result<(), VaultError> {
        if !self.touched.contains_key(account) {
            let record = self.ledger.token_account(account)?;
            self.touched.insert(
                *account,
                PreBalance {
                    mint: record.mint,
                    owner: record.owner,
                    amount: record.amount,
                },
            );
        }
        Ok(())
    }

    pub(crate) fn transfer(
        &mut self,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), VaultError> {
        self.touch(source)?;
        self.touch(destination)?;
        self.log("Instruction: Transfer");
        self.ledger.transfer(source, destination, authority, amount)?;
        Ok(())
    }

    pub(crate) fn mint_to(
        &mut self,
        mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), VaultError> {
        self.touch(destination)?;
        self.log("Instruction: MintTo");
        self.ledger.mint_to(mint, destination, authority, amount)?;
        Ok(())
    }

    pub(crate) fn burn(
        &mut self,
        account: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), VaultError> {
        self.touch(account)?;
        self.log("Instruction: Burn");
        self.ledger.burn(account, authority, amount)?;
        Ok(())
    }

    pub(crate) fn revoke(&mut self, account: &Pubkey, authority: &Pubkey) -> Result<(), VaultError> {
        self.log("Instruction: Revoke");
        self.ledger.revoke(account, authority)?;
        Ok(())
    }

    /// Consumes the context, returning the log and the balance changes.
    pub(crate) fn finish(self) -> Result<(Vec<String>, Vec<TokenBalanceChange>), VaultError> {
        let mut changes = Vec::with_capacity(self.touched.len());
        for (account, pre) in self.touched {
            let post = self.ledger.token_account(&account)?.amount;
            changes.push(TokenBalanceChange {
                account,
                mint: pre.mint,
                owner: pre.owner,
                pre: pre.amount,
                post,
            });
        }
        Ok((self.logs, changes))
    }
}
