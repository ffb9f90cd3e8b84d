//! # Scenario Runner
//!
//! A scenario is a JSON document holding a [`VaultConfig`] and a list of
//! steps. Each step drives one vault operation through the client helpers
//! against a fresh [`InMemoryLedger`]. Steps may name the error kind they
//! expect, which lets a scenario capture failure paths next to the happy
//! path.
//!
//! ```json
//! {
//!   "config": { "token_type_count_policy": "retain" },
//!   "steps": [
//!     { "action": "init_vault" },
//!     { "action": "add_deposit", "label": "gold", "amount": 2 },
//!     { "action": "activate", "number_of_shares": 0 },
//!     { "action": "combine" },
//!     { "action": "withdraw", "label": "gold", "amount": 3,
//!       "expect_error": "insufficient_balance" }
//!   ]
//! }
//! ```
//!
//! Vault errors are recorded in the report. Malformed scenarios (a step
//! before `init_vault`, an unknown deposit label) abort the run.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use token_vault::client::{
    add_safety_deposit, combine_vault, init_vault, CombineVaultSetup, InitVaultSetup,
    SafetyDepositSetup,
};
use token_vault::ledger::LedgerService;
use token_vault::{
    ErrorKind, InMemoryLedger, Pubkey, TransactionReceipt, Vault, VaultConfig, VaultError,
    VaultInstruction, VaultProgram,
};

// ---------------------------------------------------------------------------
// Scenario Format
// ---------------------------------------------------------------------------

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: VaultConfig,
    pub steps: Vec<StepEntry>,
}

/// One step plus the error kind it is expected to fail with, if any.
#[derive(Debug, Clone, Deserialize)]
pub struct StepEntry {
    #[serde(flatten)]
    pub step: Step,
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
}

fn default_true() -> bool {
    true
}

/// Vault operations a scenario can perform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Allocate accounts and run `InitVault`.
    InitVault {
        #[serde(default = "default_true")]
        allow_further_share_creation: bool,
    },
    /// Create a token type with `amount` supply and deposit all of it.
    AddDeposit { label: String, amount: u64 },
    Activate { number_of_shares: u64 },
    SetPrice {
        price_per_share: u64,
        #[serde(default = "default_true")]
        allowed_to_combine: bool,
    },
    /// Stage and submit a combine. `payment` overrides the funded amount,
    /// which otherwise matches what is owed.
    Combine {
        #[serde(default)]
        payment: Option<u64>,
    },
    MintShares { number_of_shares: u64 },
    /// Withdraw from the labelled box into that label's destination account.
    Withdraw { label: String, amount: u64 },
    /// Move treasury shares to a named holder.
    WithdrawShares { holder: String, number_of_shares: u64 },
    /// Redeem every share the named holder owns.
    Redeem { holder: String },
    AdvanceSlots { slots: u64 },
}

impl Step {
    /// Action name as written in the scenario file.
    pub fn action(&self) -> &'static str {
        match self {
            Step::InitVault { .. } => "init_vault",
            Step::AddDeposit { .. } => "add_deposit",
            Step::Activate { .. } => "activate",
            Step::SetPrice { .. } => "set_price",
            Step::Combine { .. } => "combine",
            Step::MintShares { .. } => "mint_shares",
            Step::Withdraw { .. } => "withdraw",
            Step::WithdrawShares { .. } => "withdraw_shares",
            Step::Redeem { .. } => "redeem",
            Step::AdvanceSlots { .. } => "advance_slots",
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of a single step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<ErrorKind>,
    /// Whether the outcome agrees with `expect_error`.
    pub as_expected: bool,
}

/// Final balance of one safety deposit box.
#[derive(Debug, Clone, Serialize)]
pub struct DepositReport {
    pub label: String,
    pub mint: Pubkey,
    pub store: Pubkey,
    pub balance: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn: Option<u64>,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: VaultConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_address: Option<Pubkey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault: Option<Vault>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction_supply: Option<u64>,
    pub deposits: Vec<DepositReport>,
    pub holders: BTreeMap<String, u64>,
    pub steps: Vec<StepOutcome>,
    pub slot: u64,
}

impl Report {
    /// Steps whose outcome differs from their expectation.
    pub fn mismatches(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|step| !step.as_expected)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

struct Deposit {
    setup: SafetyDepositSetup,
    destination: Option<Pubkey>,
}

struct Holder {
    owner: Pubkey,
    shares: Pubkey,
    proceeds: Option<Pubkey>,
}

/// Drives one scenario against a fresh ledger.
pub struct Runner {
    program: VaultProgram,
    ledger: InMemoryLedger,
    vault: Option<InitVaultSetup>,
    deposits: BTreeMap<String, Deposit>,
    holders: BTreeMap<String, Holder>,
}

impl Runner {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            program: VaultProgram::new(config),
            ledger: InMemoryLedger::new(),
            vault: None,
            deposits: BTreeMap::new(),
            holders: BTreeMap::new(),
        }
    }

    /// Runs every step in order and builds the report.
    pub fn run(mut self, steps: &[StepEntry]) -> Result<Report> {
        let mut outcomes = Vec::with_capacity(steps.len());

        for (index, entry) in steps.iter().enumerate() {
            let action = entry.step.action();
            debug!(index, action, "running step");

            let result = self
                .apply(&entry.step)
                .with_context(|| format!("step {index} ({action})"))?;

            let outcome = match result {
                Ok(()) => StepOutcome {
                    index,
                    action,
                    ok: true,
                    error: None,
                    message: None,
                    expected_error: entry.expect_error,
                    as_expected: entry.expect_error.is_none(),
                },
                Err(err) => {
                    let kind = err.kind();
                    if entry.expect_error != Some(kind) {
                        warn!(index, action, error = %err, "step failed");
                    }
                    StepOutcome {
                        index,
                        action,
                        ok: false,
                        error: Some(kind),
                        message: Some(err.to_string()),
                        expected_error: entry.expect_error,
                        as_expected: entry.expect_error == Some(kind),
                    }
                }
            };
            outcomes.push(outcome);
        }

        self.report(outcomes)
    }

    /// Outer `Result` is a broken scenario; inner one is the vault's verdict.
    fn apply(&mut self, step: &Step) -> Result<Result<(), VaultError>> {
        let outcome = match step {
            Step::InitVault {
                allow_further_share_creation,
            } => {
                if self.vault.is_some() {
                    bail!("vault already initialized by an earlier step");
                }
                let authority = Pubkey::new_unique();
                init_vault(
                    &mut self.ledger,
                    &self.program,
                    authority,
                    *allow_further_share_creation,
                )
                .map(|(setup, _)| {
                    info!(vault = %setup.vault, "vault initialized");
                    self.vault = Some(setup);
                })
            }
            Step::AddDeposit { label, amount } => {
                if self.deposits.contains_key(label) {
                    bail!("deposit label {label:?} used twice");
                }
                let vault = self.vault()?.clone();
                add_safety_deposit(&mut self.ledger, &self.program, &vault, *amount).map(
                    |setup| {
                        self.deposits.insert(
                            label.clone(),
                            Deposit {
                                setup,
                                destination: None,
                            },
                        );
                    },
                )
            }
            Step::Activate { number_of_shares } => {
                let vault = self.vault()?.clone();
                self.submit(vault.activate(*number_of_shares), [vault.authority])
            }
            Step::SetPrice {
                price_per_share,
                allowed_to_combine,
            } => {
                let vault = self.vault()?.clone();
                self.submit(
                    vault.update_external_price(*price_per_share, *allowed_to_combine),
                    [vault.authority],
                )
            }
            Step::Combine { payment } => {
                let vault = self.vault()?.clone();
                self.combine(&vault, *payment)
            }
            Step::MintShares { number_of_shares } => {
                let vault = self.vault()?.clone();
                self.submit(vault.mint_shares(*number_of_shares), [vault.authority])
            }
            Step::Withdraw { label, amount } => {
                let vault = self.vault()?.clone();
                let deposit = self
                    .deposits
                    .get(label)
                    .ok_or_else(|| anyhow!("unknown deposit label {label:?}"))?;
                let setup = deposit.setup.clone();
                let existing = deposit.destination;
                let destination = match existing {
                    Some(destination) => destination,
                    None => {
                        let destination = Pubkey::new_unique();
                        self.ledger
                            .create_token_account(destination, setup.token_mint, Pubkey::new_unique())
                            .context("allocating withdraw destination")?;
                        if let Some(deposit) = self.deposits.get_mut(label) {
                            deposit.destination = Some(destination);
                        }
                        destination
                    }
                };
                self.submit(setup.withdraw(&vault, destination, *amount), [vault.authority])
            }
            Step::WithdrawShares {
                holder,
                number_of_shares,
            } => {
                let vault = self.vault()?.clone();
                let shares = self.holder(holder, &vault)?.shares;
                self.submit(
                    vault.withdraw_shares(shares, *number_of_shares),
                    [vault.authority],
                )
            }
            Step::Redeem { holder } => {
                let vault = self.vault()?.clone();
                let (owner, shares) = {
                    let entry = self.holder(holder, &vault)?;
                    (entry.owner, entry.shares)
                };
                let proceeds = self.proceeds(holder, owner, &vault)?;
                self.submit(vault.redeem(shares, proceeds, owner), [owner])
            }
            Step::AdvanceSlots { slots } => {
                self.ledger.advance_slots(*slots);
                Ok(())
            }
        };
        Ok(outcome)
    }

    fn vault(&self) -> Result<&InitVaultSetup> {
        self.vault
            .as_ref()
            .ok_or_else(|| anyhow!("no vault yet; add an init_vault step first"))
    }

    fn submit(
        &mut self,
        instruction: VaultInstruction,
        signers: impl IntoIterator<Item = Pubkey>,
    ) -> Result<(), VaultError> {
        self.program
            .submit_instruction(&mut self.ledger, instruction, signers)
            .map(|receipt: TransactionReceipt| {
                debug!(slot = receipt.slot, logs = receipt.logs.len(), "transaction committed");
            })
    }

    /// Stages the settlement, funds the payment, and submits the combine.
    fn combine(&mut self, vault: &InitVaultSetup, payment: Option<u64>) -> Result<(), VaultError> {
        let ttl = self.program.config().transfer_authority_ttl_slots;
        let mut setup = CombineVaultSetup::new(vault, ttl);
        setup.create_outstanding_shares(&mut self.ledger)?;
        let payment_account = setup.create_payment(&mut self.ledger)?;
        setup.approve_transfers(&mut self.ledger)?;

        let (_, owed) = setup.required_amounts(&self.ledger)?;
        let funded = payment.unwrap_or(owed);
        if funded > 0 {
            self.ledger.mint_to(
                &vault.price_mint,
                &payment_account,
                &vault.price_mint_authority,
                funded,
            )?;
        }
        info!(vault = %vault.vault, owed, funded, "combining vault");

        combine_vault(&mut self.ledger, &self.program, &setup).map(|_| ())
    }

    /// Returns the named holder, allocating their share account on first use.
    fn holder(&mut self, name: &str, vault: &InitVaultSetup) -> Result<&Holder> {
        if !self.holders.contains_key(name) {
            let owner = Pubkey::new_unique();
            let shares = Pubkey::new_unique();
            self.ledger
                .create_token_account(shares, vault.fraction_mint, owner)
                .with_context(|| format!("allocating share account for {name:?}"))?;
            self.holders.insert(
                name.to_owned(),
                Holder {
                    owner,
                    shares,
                    proceeds: None,
                },
            );
        }
        self.holders
            .get(name)
            .ok_or_else(|| anyhow!("holder {name:?} missing"))
    }

    fn proceeds(&mut self, name: &str, owner: Pubkey, vault: &InitVaultSetup) -> Result<Pubkey> {
        let holder = self
            .holders
            .get_mut(name)
            .ok_or_else(|| anyhow!("holder {name:?} missing"))?;
        if let Some(proceeds) = holder.proceeds {
            return Ok(proceeds);
        }
        let proceeds = Pubkey::new_unique();
        self.ledger
            .create_token_account(proceeds, vault.price_mint, owner)
            .with_context(|| format!("allocating proceeds account for {name:?}"))?;
        holder.proceeds = Some(proceeds);
        Ok(proceeds)
    }

    fn report(self, steps: Vec<StepOutcome>) -> Result<Report> {
        let (vault_address, vault, fraction_supply) = match &self.vault {
            Some(setup) => (
                Some(setup.vault),
                self.ledger.vault(&setup.vault).ok(),
                Some(self.ledger.mint(&setup.fraction_mint)?.supply),
            ),
            None => (None, None, None),
        };

        let deposits = self
            .deposits
            .iter()
            .map(|(label, deposit)| DepositReport {
                label: label.clone(),
                mint: deposit.setup.token_mint,
                store: deposit.setup.store,
                balance: self.ledger.balance(&deposit.setup.store).unwrap_or_default(),
                withdrawn: deposit
                    .destination
                    .and_then(|destination| self.ledger.balance(&destination)),
            })
            .collect();

        let holders = self
            .holders
            .iter()
            .map(|(name, holder)| {
                let paid = holder
                    .proceeds
                    .and_then(|proceeds| self.ledger.balance(&proceeds))
                    .unwrap_or_default();
                (name.clone(), paid)
            })
            .collect();

        Ok(Report {
            config: *self.program.config(),
            vault_address,
            vault,
            fraction_supply,
            deposits,
            holders,
            steps,
            slot: self.ledger.slot(),
        })
    }
}

/// Loads and runs the scenario at `path`.
pub fn run_file(path: &Path) -> Result<Report> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    info!(path = %path.display(), steps = scenario.steps.len(), "running scenario");
    Runner::new(scenario.config).run(&scenario.steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use token_vault::config::TokenTypeCountPolicy;
    use token_vault::VaultState;

    fn parse(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    fn run(json: &str) -> Report {
        let scenario = parse(json);
        Runner::new(scenario.config).run(&scenario.steps).unwrap()
    }

    #[test]
    fn parses_steps_and_defaults() {
        let scenario = parse(
            r#"{ "steps": [
                { "action": "init_vault" },
                { "action": "set_price", "price_per_share": 4 },
                { "action": "withdraw", "label": "a", "amount": 1,
                  "expect_error": "insufficient_balance" }
            ] }"#,
        );
        assert_eq!(scenario.config, VaultConfig::default());
        assert!(matches!(
            scenario.steps[0].step,
            Step::InitVault {
                allow_further_share_creation: true
            }
        ));
        assert!(matches!(
            scenario.steps[1].step,
            Step::SetPrice {
                price_per_share: 4,
                allowed_to_combine: true
            }
        ));
        assert_eq!(
            scenario.steps[2].expect_error,
            Some(ErrorKind::InsufficientBalance)
        );
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        let err = serde_json::from_str::<Scenario>(r#"{ "steps": [{ "action": "explode" }] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn two_deposits_drain_to_deactivated() {
        let report = run(
            r#"{ "steps": [
                { "action": "init_vault" },
                { "action": "add_deposit", "label": "a", "amount": 2 },
                { "action": "add_deposit", "label": "b", "amount": 3 },
                { "action": "activate", "number_of_shares": 0 },
                { "action": "combine" },
                { "action": "withdraw", "label": "a", "amount": 2 },
                { "action": "withdraw", "label": "b", "amount": 3 }
            ] }"#,
        );

        assert!(report.mismatches().next().is_none());
        let vault = report.vault.unwrap();
        assert_eq!(vault.state, VaultState::Deactivated);
        assert_eq!(vault.token_type_count, 0);
        assert_eq!(report.deposits[0].withdrawn, Some(2));
        assert_eq!(report.deposits[1].withdrawn, Some(3));
    }

    #[test]
    fn expected_failures_are_recorded() {
        let report = run(
            r#"{ "config": { "token_type_count_policy": "retain" },
                 "steps": [
                { "action": "init_vault" },
                { "action": "add_deposit", "label": "a", "amount": 2 },
                { "action": "withdraw", "label": "a", "amount": 1,
                  "expect_error": "invalid_state" },
                { "action": "activate", "number_of_shares": 0 },
                { "action": "combine" },
                { "action": "withdraw", "label": "a", "amount": 3,
                  "expect_error": "insufficient_balance" },
                { "action": "withdraw", "label": "a", "amount": 2 }
            ] }"#,
        );

        assert_eq!(
            report.config.token_type_count_policy,
            TokenTypeCountPolicy::Retain
        );
        assert!(report.mismatches().next().is_none());
        assert_eq!(report.steps[2].error, Some(ErrorKind::InvalidState));
        assert!(!report.steps[5].ok);
        let vault = report.vault.unwrap();
        assert_eq!(vault.state, VaultState::Combined);
        assert_eq!(vault.token_type_count, 1);
    }

    #[test]
    fn holders_redeem_at_the_locked_price() {
        let report = run(
            r#"{ "steps": [
                { "action": "init_vault" },
                { "action": "add_deposit", "label": "a", "amount": 1 },
                { "action": "activate", "number_of_shares": 10 },
                { "action": "withdraw_shares", "holder": "carol", "number_of_shares": 4 },
                { "action": "set_price", "price_per_share": 5 },
                { "action": "combine" },
                { "action": "redeem", "holder": "carol" },
                { "action": "redeem", "holder": "carol", "expect_error": "invalid_amount" }
            ] }"#,
        );

        assert!(report.mismatches().next().is_none());
        assert_eq!(report.holders["carol"], 20);
        assert_eq!(report.fraction_supply, Some(0));
        assert_eq!(report.vault.unwrap().locked_price_per_share, 5);
    }

    #[test]
    fn underfunded_combine_is_incomplete() {
        let report = run(
            r#"{ "steps": [
                { "action": "init_vault" },
                { "action": "activate", "number_of_shares": 10 },
                { "action": "withdraw_shares", "holder": "dave", "number_of_shares": 10 },
                { "action": "set_price", "price_per_share": 2 },
                { "action": "combine", "payment": 19 }
            ] }"#,
        );

        let last = report.steps.last().unwrap();
        assert_eq!(last.error, Some(ErrorKind::IncompleteSettlement));
        assert!(!last.as_expected);
        assert_eq!(report.mismatches().count(), 1);
    }

    #[test]
    fn step_before_init_aborts() {
        let scenario = parse(r#"{ "steps": [{ "action": "activate", "number_of_shares": 1 }] }"#);
        let err = Runner::new(scenario.config)
            .run(&scenario.steps)
            .unwrap_err();
        assert!(format!("{err:#}").contains("init_vault"));
    }

    #[test]
    fn unknown_label_aborts() {
        let scenario = parse(
            r#"{ "steps": [
                { "action": "init_vault" },
                { "action": "withdraw", "label": "missing", "amount": 1 }
            ] }"#,
        );
        let err = Runner::new(scenario.config)
            .run(&scenario.steps)
            .unwrap_err();
        assert!(format!("{err:#}").contains("missing"));
    }

    #[test]
    fn run_file_reads_json_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "steps": [
                {{ "action": "init_vault" }},
                {{ "action": "advance_slots", "slots": 5 }}
            ] }}"#
        )
        .unwrap();

        let report = run_file(file.path()).unwrap();
        assert_eq!(report.steps.len(), 2);
        assert!(report.slot >= 5);
        assert_eq!(report.vault.unwrap().state, VaultState::Inactive);
    }

    #[test]
    fn bundled_scenario_runs_as_expected() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/two_deposits.json");
        let report = run_file(&path).unwrap();

        assert!(report.mismatches().next().is_none());
        assert_eq!(report.holders["alice"], 120);
        let vault = report.vault.unwrap();
        assert_eq!(vault.state, VaultState::Deactivated);
        assert_eq!(vault.token_type_count, 0);
        assert!(report.deposits.iter().all(|deposit| deposit.balance == 0));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = run_file(Path::new("/nonexistent/scenario.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/scenario.json"));
    }
}
