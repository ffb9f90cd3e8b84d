//! Integration tests for withdrawing tokens out of a combined vault.

use token_vault::client::{
    activate_and_combine_vault, add_safety_deposit, init_vault, setup_withdraw_destination,
    withdraw_to_new_destination, InitVaultSetup, SafetyDepositSetup,
};
use token_vault::ledger::LedgerService;
use token_vault::{
    ErrorKind, InMemoryLedger, Pubkey, TransactionReceipt, VaultConfig, VaultError, VaultProgram,
    VaultState,
};

/// Builds a combined vault holding one box per entry in `amounts`.
///
/// Activation issues no shares, so the fraction supply is zero once combined.
fn combined_vault(
    program: &VaultProgram,
    amounts: &[u64],
) -> (InMemoryLedger, InitVaultSetup, Vec<SafetyDepositSetup>) {
    let mut ledger = InMemoryLedger::new();
    let (vault, _) = init_vault(&mut ledger, program, Pubkey::new_unique(), true).unwrap();
    let deposits = amounts
        .iter()
        .map(|amount| add_safety_deposit(&mut ledger, program, &vault, *amount).unwrap())
        .collect();
    activate_and_combine_vault(&mut ledger, program, &vault, 0).unwrap();
    (ledger, vault, deposits)
}

fn verify_token_balance(
    receipt: &TransactionReceipt,
    account: &Pubkey,
    mint: &Pubkey,
    pre: u64,
    post: u64,
) {
    let change = receipt.balance_change(account).unwrap();
    assert_eq!(change.mint, *mint);
    assert_eq!((change.pre, change.post), (pre, post));
}

fn assert_withdraw_logs(receipt: &TransactionReceipt) {
    assert!(receipt.logs_contain("Withdraw Token from Safety Deposit Box"));
    assert!(receipt.logs_contain("Transfer"));
    assert!(receipt.logs_contain("success"));
}

fn vault_state(ledger: &InMemoryLedger, vault: &InitVaultSetup) -> (VaultState, u8) {
    let record = ledger.vault(&vault.vault).unwrap();
    (record.state, record.token_type_count)
}

// ---------------------------------------------------------------------------
// One box
// ---------------------------------------------------------------------------

#[test]
fn one_deposit_withdraw_all_tokens_deactivates_vault() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2]);
    let deposit = &deposits[0];

    let (destination, receipt) =
        withdraw_to_new_destination(&mut ledger, &program, &vault, deposit, 2).unwrap();

    assert_withdraw_logs(&receipt);
    verify_token_balance(&receipt, &deposit.store, &deposit.token_mint, 2, 0);
    verify_token_balance(&receipt, &destination, &deposit.token_mint, 0, 2);
    assert_eq!(vault_state(&ledger, &vault), (VaultState::Deactivated, 0));

    let record = ledger.vault(&vault.vault).unwrap();
    assert!(record.allow_further_share_creation);
}

#[test]
fn one_deposit_withdraw_half_keeps_vault_combined() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2]);
    let deposit = &deposits[0];

    let (destination, receipt) =
        withdraw_to_new_destination(&mut ledger, &program, &vault, deposit, 1).unwrap();

    assert_withdraw_logs(&receipt);
    verify_token_balance(&receipt, &deposit.store, &deposit.token_mint, 2, 1);
    verify_token_balance(&receipt, &destination, &deposit.token_mint, 0, 1);
    assert_eq!(vault_state(&ledger, &vault), (VaultState::Combined, 1));
}

#[test]
fn retain_policy_keeps_counting_an_emptied_box() {
    let program = VaultProgram::new(VaultConfig::retaining());
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2]);

    withdraw_to_new_destination(&mut ledger, &program, &vault, &deposits[0], 2).unwrap();

    assert_eq!(ledger.balance(&deposits[0].store), Some(0));
    assert_eq!(vault_state(&ledger, &vault), (VaultState::Combined, 1));
}

// ---------------------------------------------------------------------------
// Two boxes
// ---------------------------------------------------------------------------

/// Withdraws 1 from the first box, 3 from the second, then 1 from the first,
/// returning the vault state and count after each step.
fn drain_two_deposits(program: &VaultProgram) -> Vec<(VaultState, u8)> {
    let (mut ledger, vault, deposits) = combined_vault(program, &[2, 3]);
    let (first, second) = (&deposits[0], &deposits[1]);
    let mut states = Vec::new();

    let (dest_a, receipt) =
        withdraw_to_new_destination(&mut ledger, program, &vault, first, 1).unwrap();
    assert_withdraw_logs(&receipt);
    verify_token_balance(&receipt, &first.store, &first.token_mint, 2, 1);
    verify_token_balance(&receipt, &dest_a, &first.token_mint, 0, 1);
    states.push(vault_state(&ledger, &vault));

    let (dest_b, receipt) =
        withdraw_to_new_destination(&mut ledger, program, &vault, second, 3).unwrap();
    verify_token_balance(&receipt, &second.store, &second.token_mint, 3, 0);
    verify_token_balance(&receipt, &dest_b, &second.token_mint, 0, 3);
    states.push(vault_state(&ledger, &vault));

    let (dest_c, receipt) =
        withdraw_to_new_destination(&mut ledger, program, &vault, first, 1).unwrap();
    verify_token_balance(&receipt, &first.store, &first.token_mint, 1, 0);
    verify_token_balance(&receipt, &dest_c, &first.token_mint, 0, 1);
    states.push(vault_state(&ledger, &vault));

    assert_eq!(ledger.balance(&first.store), Some(0));
    assert_eq!(ledger.balance(&second.store), Some(0));
    assert_eq!(
        ledger.balance(&dest_a).unwrap() + ledger.balance(&dest_c).unwrap(),
        2
    );
    assert_eq!(ledger.balance(&dest_b), Some(3));
    states
}

#[test]
fn two_deposits_drained_with_decrement_policy_deactivate() {
    let states = drain_two_deposits(&VaultProgram::default());
    assert_eq!(
        states,
        vec![
            (VaultState::Combined, 2),
            (VaultState::Combined, 1),
            (VaultState::Deactivated, 0),
        ]
    );
}

#[test]
fn two_deposits_drained_with_retain_policy_stay_combined() {
    let states = drain_two_deposits(&VaultProgram::new(VaultConfig::retaining()));
    assert_eq!(
        states,
        vec![
            (VaultState::Combined, 2),
            (VaultState::Combined, 2),
            (VaultState::Combined, 2),
        ]
    );
}

#[test]
fn split_withdrawal_matches_single_withdrawal() {
    let program = VaultProgram::default();

    let (mut split_ledger, split_vault, split) = combined_vault(&program, &[5]);
    let destination = setup_withdraw_destination(&mut split_ledger, split[0].token_mint).unwrap();
    for amount in [2, 3] {
        program
            .submit_instruction(
                &mut split_ledger,
                split[0].withdraw(&split_vault, destination, amount),
                [split_vault.authority],
            )
            .unwrap();
    }

    let (mut single_ledger, single_vault, single) = combined_vault(&program, &[5]);
    let (single_destination, _) =
        withdraw_to_new_destination(&mut single_ledger, &program, &single_vault, &single[0], 5)
            .unwrap();

    assert_eq!(split_ledger.balance(&split[0].store), Some(0));
    assert_eq!(single_ledger.balance(&single[0].store), Some(0));
    assert_eq!(split_ledger.balance(&destination), Some(5));
    assert_eq!(single_ledger.balance(&single_destination), Some(5));
    assert_eq!(
        vault_state(&split_ledger, &split_vault),
        vault_state(&single_ledger, &single_vault)
    );
}

// ---------------------------------------------------------------------------
// Invalid cases
// ---------------------------------------------------------------------------

#[test]
fn overdraw_fails_with_insufficient_balance() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2]);
    let destination = setup_withdraw_destination(&mut ledger, deposits[0].token_mint).unwrap();
    let before = ledger.clone();

    let err = program
        .submit_instruction(
            &mut ledger,
            deposits[0].withdraw(&vault, destination, 3),
            [vault.authority],
        )
        .unwrap_err();

    assert_eq!(
        err,
        VaultError::InsufficientBalance {
            requested: 3,
            available: 2,
        }
    );
    assert_eq!(ledger, before);
}

#[test]
fn zero_withdrawal_is_rejected() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2]);
    let destination = setup_withdraw_destination(&mut ledger, deposits[0].token_mint).unwrap();

    let err = program
        .submit_instruction(
            &mut ledger,
            deposits[0].withdraw(&vault, destination, 0),
            [vault.authority],
        )
        .unwrap_err();
    assert_eq!(err, VaultError::InvalidAmount);
}

#[test]
fn withdrawal_from_active_vault_is_rejected() {
    let program = VaultProgram::default();
    let mut ledger = InMemoryLedger::new();
    let (vault, _) = init_vault(&mut ledger, &program, Pubkey::new_unique(), true).unwrap();
    let deposit = add_safety_deposit(&mut ledger, &program, &vault, 2).unwrap();
    program
        .submit_instruction(&mut ledger, vault.activate(10), [vault.authority])
        .unwrap();
    let destination = setup_withdraw_destination(&mut ledger, deposit.token_mint).unwrap();

    let err = program
        .submit_instruction(
            &mut ledger,
            deposit.withdraw(&vault, destination, 1),
            [vault.authority],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(ledger.balance(&deposit.store), Some(2));
}

#[test]
fn withdrawal_from_deactivated_vault_is_rejected() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[1]);
    withdraw_to_new_destination(&mut ledger, &program, &vault, &deposits[0], 1).unwrap();

    let err = withdraw_to_new_destination(&mut ledger, &program, &vault, &deposits[0], 1)
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::InvalidState {
            current: VaultState::Deactivated,
            ..
        }
    ));
}

#[test]
fn withdrawal_into_own_store_is_rejected() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2]);
    let deposit = &deposits[0];

    let err = program
        .submit_instruction(
            &mut ledger,
            deposit.withdraw(&vault, deposit.store, 2),
            [vault.authority],
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAccount);
    assert_eq!(ledger.balance(&deposit.store), Some(2));
    assert_eq!(vault_state(&ledger, &vault), (VaultState::Combined, 1));
}

#[test]
fn refilled_box_is_counted_out_only_once() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2, 3]);
    let (first, second) = (&deposits[0], &deposits[1]);

    let holder = Pubkey::new_unique();
    let holding = Pubkey::new_unique();
    ledger
        .create_token_account(holding, first.token_mint, holder)
        .unwrap();
    program
        .submit_instruction(
            &mut ledger,
            first.withdraw(&vault, holding, 2),
            [vault.authority],
        )
        .unwrap();
    assert_eq!(vault_state(&ledger, &vault), (VaultState::Combined, 1));
    assert!(ledger.safety_deposit(&first.safety_deposit).unwrap().emptied);

    // Anyone may send tokens back into an emptied store.
    ledger.transfer(&holding, &first.store, &holder, 1).unwrap();
    program
        .submit_instruction(
            &mut ledger,
            first.withdraw(&vault, holding, 1),
            [vault.authority],
        )
        .unwrap();
    assert_eq!(vault_state(&ledger, &vault), (VaultState::Combined, 1));
    assert_eq!(ledger.balance(&second.store), Some(3));

    let (destination, _) =
        withdraw_to_new_destination(&mut ledger, &program, &vault, second, 3).unwrap();
    assert_eq!(ledger.balance(&destination), Some(3));
    assert_eq!(vault_state(&ledger, &vault), (VaultState::Deactivated, 0));
}

#[test]
fn store_of_another_box_is_rejected() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2, 3]);
    let destination = setup_withdraw_destination(&mut ledger, deposits[1].token_mint).unwrap();

    let mut mismatched = deposits[0].clone();
    mismatched.store = deposits[1].store;
    let err = program
        .submit_instruction(
            &mut ledger,
            mismatched.withdraw(&vault, destination, 1),
            [vault.authority],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAccount);
}

#[test]
fn destination_of_wrong_mint_is_rejected() {
    let program = VaultProgram::default();
    let (mut ledger, vault, deposits) = combined_vault(&program, &[2, 3]);
    let wrong = setup_withdraw_destination(&mut ledger, deposits[1].token_mint).unwrap();

    let err = program
        .submit_instruction(
            &mut ledger,
            deposits[0].withdraw(&vault, wrong, 1),
            [vault.authority],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ledger);
    assert_eq!(ledger.balance(&deposits[0].store), Some(2));
}
