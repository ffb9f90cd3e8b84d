//! Integration tests for minting fractional shares to the treasury.
//!
//! Mirrors the end-to-end suite that ran against a live validator: each
//! test drives the program through the client helpers and checks the
//! receipt logs plus the pre/post treasury balances.

use token_vault::client::{init_and_activate_vault, init_vault, InitVaultSetup};
use token_vault::ledger::LedgerService;
use token_vault::{ErrorKind, InMemoryLedger, Pubkey, VaultConfig, VaultError, VaultProgram};

fn program() -> VaultProgram {
    VaultProgram::new(VaultConfig::default())
}

/// Mints `shares` and asserts the treasury moved from `previously_minted`
/// to `previously_minted + shares`.
fn run_and_verify(
    ledger: &mut InMemoryLedger,
    program: &VaultProgram,
    vault: &InitVaultSetup,
    shares: u64,
    previously_minted: u64,
) {
    let receipt = program
        .submit_instruction(ledger, vault.mint_shares(shares), [vault.authority])
        .unwrap();

    assert!(receipt.logs_contain("Mint new fractional shares"));
    assert!(receipt.logs_contain("MintTo"));
    assert!(receipt.logs_contain("success"));

    // The derived mint authority owns the treasury and received the shares.
    let change = receipt
        .balance_for(&vault.fraction_mint, &vault.fraction_mint_authority)
        .unwrap();
    assert_eq!(change.account, vault.fraction_treasury);
    assert_eq!(change.pre, previously_minted);
    assert_eq!(change.post, previously_minted + shares);

    let treasury = ledger.token_account(&vault.fraction_treasury).unwrap();
    assert_eq!(treasury.amount, previously_minted + shares);
    assert_eq!(treasury.owner, vault.fraction_mint_authority);
    assert_eq!(
        ledger.mint(&vault.fraction_mint).unwrap().supply,
        previously_minted + shares
    );
}

// ---------------------------------------------------------------------------
// Valid cases
// ---------------------------------------------------------------------------

#[test]
fn active_vault_mints_various_sizes_up_to_five_billion() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let vault = init_and_activate_vault(&mut ledger, &program, Pubkey::new_unique(), true, 0)
        .unwrap();

    run_and_verify(&mut ledger, &program, &vault, 0, 0);
    run_and_verify(&mut ledger, &program, &vault, 5, 0);
    run_and_verify(&mut ledger, &program, &vault, 4_999_999_995, 5);

    assert_eq!(
        ledger.balance(&vault.fraction_treasury),
        Some(5_000_000_000)
    );
}

#[test]
fn minting_zero_leaves_balances_unchanged() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let vault = init_and_activate_vault(&mut ledger, &program, Pubkey::new_unique(), true, 7)
        .unwrap();

    run_and_verify(&mut ledger, &program, &vault, 0, 7);
}

#[test]
fn minting_zero_is_allowed_even_when_shares_are_locked() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let vault = init_and_activate_vault(&mut ledger, &program, Pubkey::new_unique(), false, 0)
        .unwrap();

    run_and_verify(&mut ledger, &program, &vault, 0, 0);
}

// ---------------------------------------------------------------------------
// Invalid cases
// ---------------------------------------------------------------------------

#[test]
fn inactive_vault_cannot_mint() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let authority = Pubkey::new_unique();
    let (vault, _) = init_vault(&mut ledger, &program, authority, true).unwrap();
    let before = ledger.clone();

    let err = program
        .submit_instruction(&mut ledger, vault.mint_shares(5), [authority])
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(err.to_string().contains("Inactive"));
    assert_eq!(ledger, before);
}

#[test]
fn locked_vault_rejects_positive_mint() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let vault = init_and_activate_vault(&mut ledger, &program, Pubkey::new_unique(), false, 0)
        .unwrap();

    let err = program
        .submit_instruction(&mut ledger, vault.mint_shares(5), [vault.authority])
        .unwrap_err();

    assert_eq!(err, VaultError::SharesLocked);
    assert!(err
        .to_string()
        .contains("vault does not allow the minting of new shares"));
    assert_eq!(ledger.balance(&vault.fraction_treasury), Some(0));
}

#[test]
fn mint_requires_the_vault_authority() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let vault = init_and_activate_vault(&mut ledger, &program, Pubkey::new_unique(), true, 0)
        .unwrap();

    let stranger = Pubkey::new_unique();
    let mut forged = vault.clone();
    forged.authority = stranger;
    let err = program
        .submit_instruction(&mut ledger, forged.mint_shares(5), [stranger])
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn mint_into_foreign_treasury_is_rejected() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let vault = init_and_activate_vault(&mut ledger, &program, Pubkey::new_unique(), true, 0)
        .unwrap();

    let mut redirected = vault.clone();
    redirected.fraction_treasury = Pubkey::new_unique();
    ledger
        .create_token_account(
            redirected.fraction_treasury,
            vault.fraction_mint,
            Pubkey::new_unique(),
        )
        .unwrap();

    let err = program
        .submit_instruction(&mut ledger, redirected.mint_shares(5), [vault.authority])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAccount);
}

#[test]
fn combined_vault_cannot_mint() {
    let program = program();
    let mut ledger = InMemoryLedger::new();
    let authority = Pubkey::new_unique();
    let (vault, _) = init_vault(&mut ledger, &program, authority, true).unwrap();
    token_vault::client::activate_and_combine_vault(&mut ledger, &program, &vault, 0).unwrap();

    let err = program
        .submit_instruction(&mut ledger, vault.mint_shares(1), [authority])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}
