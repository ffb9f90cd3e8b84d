//! # In-Memory Ledger
//!
//! A deterministic [`LedgerService`] backed by a `BTreeMap`. Used by the
//! tests, by the scenario runner, and anywhere the vault state machine has
//! to run without a cluster.
//!
//! The ledger is `Clone`, which is how transaction-level atomicity works:
//! the program executes a transaction against a copy and swaps it in only
//! if every instruction succeeded. Ordered maps keep snapshots stable, so
//! two runs of the same scenario serialize to the same JSON modulo the
//! random addresses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Account, Delegation, LedgerError, LedgerService, Mint, TokenAccount};
use crate::pubkey::Pubkey;
use crate::state::{ExternalPriceAccount, SafetyDepositBox, Vault};

/// Deterministic ledger for tests and simulations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    /// Current slot.
    slot: u64,
    /// All records, keyed by address.
    accounts: BTreeMap<Pubkey, Account>,
}

impl InMemoryLedger {
    /// Creates an empty ledger at slot zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw record at `address`, if any.
    pub fn account(&self, address: &Pubkey) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Iterates over every record in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Pubkey, &Account)> {
        self.accounts.iter()
    }

    /// Number of records on the ledger.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Serializes the whole ledger for inspection or dumping.
    pub fn snapshot(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Convenience: balance of a token account, or `None` if there is none.
    pub fn balance(&self, address: &Pubkey) -> Option<u64> {
        match self.accounts.get(address) {
            Some(Account::Token(account)) => Some(account.amount),
            _ => None,
        }
    }

    fn insert_new(&mut self, address: Pubkey, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&address) {
            return Err(LedgerError::AccountAlreadyExists(address));
        }
        self.accounts.insert(address, account);
        Ok(())
    }

    /// Overwrites a record of the same kind, or creates it if the address is free.
    fn upsert(
        &mut self,
        address: Pubkey,
        account: Account,
        expected: &'static str,
    ) -> Result<(), LedgerError> {
        if let Some(existing) = self.accounts.get(&address) {
            if std::mem::discriminant(existing) != std::mem::discriminant(&account) {
                return Err(LedgerError::AccountTypeMismatch { address, expected });
            }
        }
        self.accounts.insert(address, account);
        Ok(())
    }

    fn token_mut(&mut self, address: &Pubkey) -> Result<&mut TokenAccount, LedgerError> {
        match self.accounts.get_mut(address) {
            Some(Account::Token(account)) => Ok(account),
            Some(_) => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "token account",
            }),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    fn mint_mut(&mut self, address: &Pubkey) -> Result<&mut Mint, LedgerError> {
        match self.accounts.get_mut(address) {
            Some(Account::Mint(mint)) => Ok(mint),
            Some(_) => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "mint",
            }),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    /// Checks that `authority` may take `amount` out of `account` at `slot`.
    ///
    /// Returns the delegation as it should read after the debit, so callers
    /// can validate everything first and write once.
    fn authorize_debit(
        address: &Pubkey,
        account: &TokenAccount,
        authority: &Pubkey,
        amount: u64,
        slot: u64,
    ) -> Result<Option<Delegation>, LedgerError> {
        if account.amount < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *address,
                available: account.amount,
                requested: amount,
            });
        }

        if account.owner == *authority {
            return Ok(account.delegate.clone());
        }

        match &account.delegate {
            Some(delegation) if delegation.delegate == *authority => {
                if delegation.is_expired(slot) {
                    return Err(LedgerError::DelegationExpired {
                        account: *address,
                        expired_at: delegation.expires_at_slot.unwrap_or_default(),
                    });
                }
                if delegation.amount < amount {
                    return Err(LedgerError::OwnerMismatch {
                        account: *address,
                        authority: *authority,
                    });
                }
                let remaining = delegation.amount - amount;
                Ok((remaining > 0).then(|| Delegation {
                    amount: remaining,
                    ..delegation.clone()
                }))
            }
            _ => Err(LedgerError::OwnerMismatch {
                account: *address,
                authority: *authority,
            }),
        }
    }
}

impl LedgerService for InMemoryLedger {
    fn slot(&self) -> u64 {
        self.slot
    }

    fn advance_slots(&mut self, slots: u64) {
        self.slot = self.slot.saturating_add(slots);
    }

    fn exists(&self, address: &Pubkey) -> bool {
        self.accounts.contains_key(address)
    }

    fn mint(&self, address: &Pubkey) -> Result<Mint, LedgerError> {
        match self.accounts.get(address) {
            Some(Account::Mint(mint)) => Ok(mint.clone()),
            Some(_) => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "mint",
            }),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    fn token_account(&self, address: &Pubkey) -> Result<TokenAccount, LedgerError> {
        match self.accounts.get(address) {
            Some(Account::Token(account)) => Ok(account.clone()),
            Some(_) => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "token account",
            }),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    fn vault(&self, address: &Pubkey) -> Result<Vault, LedgerError> {
        match self.accounts.get(address) {
            Some(Account::Vault(vault)) => Ok(vault.clone()),
            Some(_) => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "vault",
            }),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    fn safety_deposit(&self, address: &Pubkey) -> Result<SafetyDepositBox, LedgerError> {
        match self.accounts.get(address) {
            Some(Account::SafetyDeposit(record)) => Ok(record.clone()),
            Some(_) => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "safety deposit box",
            }),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    fn external_price(&self, address: &Pubkey) -> Result<ExternalPriceAccount, LedgerError> {
        match self.accounts.get(address) {
            Some(Account::ExternalPrice(price)) => Ok(price.clone()),
            Some(_) => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "external price account",
            }),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    fn create_mint(
        &mut self,
        address: Pubkey,
        mint_authority: Pubkey,
        decimals: u8,
    ) -> Result<(), LedgerError> {
        self.insert_new(
            address,
            Account::Mint(Mint {
                mint_authority: Some(mint_authority),
                supply: 0,
                decimals,
            }),
        )
    }

    fn create_token_account(
        &mut self,
        address: Pubkey,
        mint: Pubkey,
        owner: Pubkey,
    ) -> Result<(), LedgerError> {
        // The mint has to exist before anyone can hold it.
        self.mint(&mint)?;
        self.insert_new(address, Account::Token(TokenAccount::new(mint, owner)))
    }

    fn put_vault(&mut self, address: Pubkey, vault: Vault) -> Result<(), LedgerError> {
        self.upsert(address, Account::Vault(vault), "vault")
    }

    fn put_safety_deposit(
        &mut self,
        address: Pubkey,
        safety_deposit: SafetyDepositBox,
    ) -> Result<(), LedgerError> {
        self.upsert(
            address,
            Account::SafetyDeposit(safety_deposit),
            "safety deposit box",
        )
    }

    fn put_external_price(
        &mut self,
        address: Pubkey,
        price: ExternalPriceAccount,
    ) -> Result<(), LedgerError> {
        self.upsert(
            address,
            Account::ExternalPrice(price),
            "external price account",
        )
    }

    fn transfer(
        &mut self,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let from = self.token_account(source)?;
        let to = self.token_account(destination)?;
        if from.mint != to.mint {
            return Err(LedgerError::MintMismatch {
                expected: from.mint,
                found: to.mint,
            });
        }

        let delegate_after = Self::authorize_debit(source, &from, authority, amount, self.slot)?;
        if source == destination {
            self.token_mut(source)?.delegate = delegate_after;
            return Ok(());
        }

        let credited = to
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*destination))?;

        let from = self.token_mut(source)?;
        from.amount -= amount;
        from.delegate = delegate_after;
        self.token_mut(destination)?.amount = credited;
        Ok(())
    }

    fn mint_to(
        &mut self,
        mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let record = self.mint(mint)?;
        let to = self.token_account(destination)?;
        if to.mint != *mint {
            return Err(LedgerError::MintMismatch {
                expected: *mint,
                found: to.mint,
            });
        }
        if record.mint_authority != Some(*authority) {
            return Err(LedgerError::MintAuthorityMismatch {
                mint: *mint,
                authority: *authority,
            });
        }

        let supply = record
            .supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*mint))?;
        let credited = to
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*destination))?;

        self.mint_mut(mint)?.supply = supply;
        self.token_mut(destination)?.amount = credited;
        Ok(())
    }

    fn burn(
        &mut self,
        account: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let holder = self.token_account(account)?;
        let record = self.mint(&holder.mint)?;
        let delegate_after = Self::authorize_debit(account, &holder, authority, amount, self.slot)?;

        // Supply always covers any single holder's balance.
        let supply = record.supply.saturating_sub(amount);

        self.mint_mut(&holder.mint)?.supply = supply;
        let holder = self.token_mut(account)?;
        holder.amount -= amount;
        holder.delegate = delegate_after;
        Ok(())
    }

    fn approve(
        &mut self,
        account: &Pubkey,
        owner: &Pubkey,
        delegation: Delegation,
    ) -> Result<(), LedgerError> {
        let holder = self.token_mut(account)?;
        if holder.owner != *owner {
            return Err(LedgerError::OwnerMismatch {
                account: *account,
                authority: *owner,
            });
        }
        holder.delegate = Some(delegation);
        Ok(())
    }

    fn revoke(&mut self, account: &Pubkey, authority: &Pubkey) -> Result<(), LedgerError> {
        let holder = self.token_mut(account)?;
        let Some(delegation) = &holder.delegate else {
            return Ok(());
        };
        if holder.owner != *authority && delegation.delegate != *authority {
            return Err(LedgerError::OwnerMismatch {
                account: *account,
                authority: *authority,
            });
        }
        holder.delegate = None;
        Ok(())
    }
}
