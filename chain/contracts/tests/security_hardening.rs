//! Security Hardening Tests
//!
//! Adversarial testing of the escrow program:
//! - Authorization (wrong signer, missing signature, forged signature)
//! - Mint substitution
//! - Insufficient funds and zero amounts
//! - Account substitution (vault, record, derived address)
//! - Replay
//! - Fuzz testing (proptest)

mod common;

use common::{program_error, World, STARTING_A, STARTING_B};
use escrow_contracts::errors::{EscrowError, TransactionError};
use escrow_contracts::instruction;
use escrow_contracts::transaction::{AccountMeta, Transaction};
use escrow_types::signer::Keypair;
use proptest::prelude::*;

/// Snapshot of everything an attacker could try to move.
fn balances(w: &World) -> [u64; 4] {
    [
        w.balance(&w.maker.pubkey(), &w.mint_a),
        w.balance(&w.maker.pubkey(), &w.mint_b),
        w.balance(&w.taker.pubkey(), &w.mint_a),
        w.balance(&w.taker.pubkey(), &w.mint_b),
    ]
}

// ═══════════════════════════════════════════════════════════════════
// Authorization
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_refund_by_stranger_is_unauthorized() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    let attacker = Keypair::new();
    w.ledger.airdrop(&attacker.pubkey(), common::SOL).unwrap();
    let root = w.ledger.state_root();

    let config = w.ledger.config();
    let ix = instruction::refund(config, &attacker.pubkey(), &w.escrow(1), &w.mint_a).unwrap();
    assert_eq!(program_error(w.send(ix, &[&attacker])), EscrowError::Unauthorized);

    assert_eq!(w.ledger.state_root(), root);
    assert!(w.ledger.escrow_record(&w.escrow(1)).is_some());
    assert_eq!(w.ledger.token_balance(&w.vault(1)), Some(100));
}

#[test]
fn test_refund_by_taker_is_unauthorized() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    let before = balances(&w);

    let ix =
        instruction::refund(w.ledger.config(), &w.taker.pubkey(), &w.escrow(1), &w.mint_a).unwrap();
    assert_eq!(program_error(w.send(ix, &[&w.taker])), EscrowError::Unauthorized);
    assert_eq!(balances(&w), before);
}

#[test]
fn test_refund_without_maker_signature() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();

    let maker = w.maker.pubkey();
    let mut ix = instruction::refund(w.ledger.config(), &maker, &w.escrow(1), &w.mint_a).unwrap();
    ix.accounts[0].is_signer = false;
    let payer = Keypair::new();
    assert_eq!(program_error(w.send(ix, &[&payer])), EscrowError::Unauthorized);
}

#[test]
fn test_unsigned_taker_rejected() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();

    let mut ix = instruction::take(
        w.ledger.config(),
        &w.taker.pubkey(),
        &w.maker.pubkey(),
        &w.escrow(1),
        &w.mint_a,
        &w.mint_b,
    )
    .unwrap();
    ix.accounts[0].is_signer = false;
    assert_eq!(program_error(w.send(ix, &[])), EscrowError::Unauthorized);
}

#[test]
fn test_make_for_another_maker_without_signature() {
    let w = World::new();
    let mut ix = instruction::make(
        w.ledger.config(),
        &w.maker.pubkey(),
        &w.mint_a,
        &w.mint_b,
        1,
        100,
        200,
    )
    .unwrap();
    ix.accounts[0].is_signer = false;
    assert_eq!(program_error(w.send(ix, &[&w.taker])), EscrowError::Unauthorized);
    assert_eq!(w.balance(&w.maker.pubkey(), &w.mint_a), STARTING_A);
}

#[test]
fn test_forged_signature_rejected() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();

    let maker = w.maker.pubkey();
    let ix = instruction::refund(w.ledger.config(), &maker, &w.escrow(1), &w.mint_a).unwrap();
    let mut tx = Transaction::new_signed(vec![ix], 99, &[&w.taker]);
    tx.signatures[0].0 = w.maker.pubkey();
    assert_eq!(
        w.ledger.process_transaction(&tx),
        Err(TransactionError::SignatureFailure(w.maker.pubkey()))
    );
}

#[test]
fn test_take_redirecting_payment_is_unauthorized() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    let before = balances(&w);

    // taker names themself as the maker to keep their own B
    let ix = instruction::take(
        w.ledger.config(),
        &w.taker.pubkey(),
        &w.taker.pubkey(),
        &w.escrow(1),
        &w.mint_a,
        &w.mint_b,
    )
    .unwrap();
    assert_eq!(program_error(w.send(ix, &[&w.taker])), EscrowError::Unauthorized);
    assert_eq!(balances(&w), before);
}

// ═══════════════════════════════════════════════════════════════════
// Mint integrity
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_take_with_substituted_mint_a() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    let fake_a = w.ledger.create_mint(&w.authority.pubkey(), common::DECIMALS);
    let before = balances(&w);

    let ix = instruction::take(
        w.ledger.config(),
        &w.taker.pubkey(),
        &w.maker.pubkey(),
        &w.escrow(1),
        &fake_a,
        &w.mint_b,
    )
    .unwrap();
    assert_eq!(program_error(w.send(ix, &[&w.taker])), EscrowError::MintMismatch);
    assert_eq!(balances(&w), before);
    assert!(w.ledger.escrow_record(&w.escrow(1)).is_some());
}

#[test]
fn test_take_with_substituted_mint_b() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    let fake_b = w.ledger.create_mint(&w.taker.pubkey(), common::DECIMALS);
    let taker_fake = w.ledger.create_token_account(&w.taker.pubkey(), &fake_b).unwrap();
    w.ledger.mint_to(&fake_b, &taker_fake, &w.taker, 1_000_000).unwrap();
    let before = balances(&w);

    let ix = instruction::take(
        w.ledger.config(),
        &w.taker.pubkey(),
        &w.maker.pubkey(),
        &w.escrow(1),
        &w.mint_a,
        &fake_b,
    )
    .unwrap();
    assert_eq!(program_error(w.send(ix, &[&w.taker])), EscrowError::MintMismatch);
    assert_eq!(balances(&w), before);
    assert_eq!(w.ledger.token_balance(&w.vault(1)), Some(100));
}

#[test]
fn test_refund_with_substituted_mint() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    let fake_a = w.ledger.create_mint(&w.authority.pubkey(), common::DECIMALS);

    let maker = w.maker.pubkey();
    let ix = instruction::refund(w.ledger.config(), &maker, &w.escrow(1), &fake_a).unwrap();
    assert_eq!(program_error(w.send(ix, &[&w.maker])), EscrowError::MintMismatch);
}

#[test]
fn test_make_from_wrong_mint_account() {
    let w = World::new();
    let mut ix = instruction::make(
        w.ledger.config(),
        &w.maker.pubkey(),
        &w.mint_a,
        &w.mint_b,
        1,
        100,
        200,
    )
    .unwrap();
    // the taker's B account in place of the maker's A account
    ix.accounts[4] = AccountMeta::new(w.taker_ata_b, false);
    assert_eq!(program_error(w.send(ix, &[&w.maker])), EscrowError::InvalidTokenAccount);
}

// ═══════════════════════════════════════════════════════════════════
// Amounts
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_zero_amounts_rejected() {
    let w = World::new();
    assert_eq!(program_error(w.make(1, 0, 200)), EscrowError::InvalidAmount);
    assert_eq!(program_error(w.make(1, 100, 0)), EscrowError::InvalidAmount);
    assert!(w.ledger.escrow_record(&w.escrow(1)).is_none());
}

#[test]
fn test_make_insufficient_funds() {
    let w = World::new();
    assert_eq!(
        program_error(w.make(1, STARTING_A + 1, 200)),
        EscrowError::InsufficientFunds {
            required: STARTING_A + 1,
            available: STARTING_A
        }
    );
    assert!(w.ledger.account(&w.escrow(1)).is_none());
    assert!(w.ledger.account(&w.vault(1)).is_none());
}

#[test]
fn test_take_insufficient_funds() {
    let w = World::new();
    w.make(1, 100, STARTING_B + 1).unwrap();
    let before = balances(&w);
    let taker_lamports = w.ledger.lamports(&w.taker.pubkey());

    assert_eq!(
        program_error(w.take(1)),
        EscrowError::InsufficientFunds {
            required: STARTING_B + 1,
            available: STARTING_B
        }
    );
    assert_eq!(balances(&w), before);
    assert_eq!(w.ledger.lamports(&w.taker.pubkey()), taker_lamports);
    assert!(w.ledger.account(&w.ata(&w.taker.pubkey(), &w.mint_a)).is_none());
}

// ═══════════════════════════════════════════════════════════════════
// Account substitution
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_duplicate_make_rejected() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    assert_eq!(program_error(w.make(1, 50, 60)), EscrowError::RecordAlreadyExists);
    assert_eq!(w.ledger.token_balance(&w.vault(1)), Some(100));
    assert_eq!(w.balance(&w.maker.pubkey(), &w.mint_a), STARTING_A - 100);
}

#[test]
fn test_make_at_non_derived_address() {
    let w = World::new();
    let mut ix = instruction::make(
        w.ledger.config(),
        &w.maker.pubkey(),
        &w.mint_a,
        &w.mint_b,
        1,
        100,
        200,
    )
    .unwrap();
    ix.accounts[1] = AccountMeta::new(w.escrow(2), false);
    assert_eq!(program_error(w.send(ix, &[&w.maker])), EscrowError::InvalidSeeds);
}

#[test]
fn test_take_with_substituted_vault() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    w.make(2, 500, 200).unwrap();

    // point seed 1's take at seed 2's richer vault
    let mut ix = instruction::take(
        w.ledger.config(),
        &w.taker.pubkey(),
        &w.maker.pubkey(),
        &w.escrow(1),
        &w.mint_a,
        &w.mint_b,
    )
    .unwrap();
    ix.accounts[5] = AccountMeta::new(w.vault(2), false);
    assert_eq!(program_error(w.send(ix, &[&w.taker])), EscrowError::InvalidVault);
    assert_eq!(w.ledger.token_balance(&w.vault(2)), Some(500));
}

#[test]
fn test_take_against_non_record_account() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();

    // a token account posing as an escrow record
    let ix = instruction::take(
        w.ledger.config(),
        &w.taker.pubkey(),
        &w.maker.pubkey(),
        &w.maker_ata_a,
        &w.mint_a,
        &w.mint_b,
    )
    .unwrap();
    assert_eq!(program_error(w.send(ix, &[&w.taker])), EscrowError::InvalidAccountData);
}

#[test]
fn test_refund_into_foreign_token_account() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    let thief_ata = w.ledger.create_token_account(&w.taker.pubkey(), &w.mint_a).unwrap();

    let maker = w.maker.pubkey();
    let mut ix = instruction::refund(w.ledger.config(), &maker, &w.escrow(1), &w.mint_a).unwrap();
    ix.accounts[4] = AccountMeta::new(thief_ata, false);
    assert_eq!(program_error(w.send(ix, &[&w.maker])), EscrowError::InvalidTokenAccount);
    assert_eq!(w.ledger.token_balance(&thief_ata), Some(0));
}

#[test]
fn test_wrong_token_program_rejected() {
    let w = World::new();
    let mut ix = instruction::make(
        w.ledger.config(),
        &w.maker.pubkey(),
        &w.mint_a,
        &w.mint_b,
        1,
        100,
        200,
    )
    .unwrap();
    ix.accounts[7] = AccountMeta::new_readonly(escrow_types::pubkey::Pubkey::new_unique(), false);
    assert_eq!(program_error(w.send(ix, &[&w.maker])), EscrowError::IncorrectProgramId);
}

// ═══════════════════════════════════════════════════════════════════
// Replay
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_replayed_take_rejected() {
    let w = World::new();
    w.make(1, 100, 200).unwrap();
    w.make(2, 100, 200).unwrap();

    let ix = instruction::take(
        w.ledger.config(),
        &w.taker.pubkey(),
        &w.maker.pubkey(),
        &w.escrow(1),
        &w.mint_a,
        &w.mint_b,
    )
    .unwrap();
    let tx = Transaction::new_signed(vec![ix], 7, &[&w.taker]);
    w.ledger.process_transaction(&tx).unwrap();
    assert_eq!(
        w.ledger.process_transaction(&tx),
        Err(TransactionError::AlreadyProcessed)
    );
    assert_eq!(w.balance(&w.taker.pubkey(), &w.mint_b), STARTING_B - 200);
}

// ═══════════════════════════════════════════════════════════════════
// Fuzz testing
// ═══════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_take_conserves_supply(
        seed in any::<u64>(),
        deposit in 1u64..=STARTING_A,
        receive in 1u64..=2 * STARTING_B,
    ) {
        let w = World::new();
        let supply_a = w.ledger.token_supply(&w.mint_a);
        let supply_b = w.ledger.token_supply(&w.mint_b);

        w.make(seed, deposit, receive).unwrap();
        let result = w.take(seed);

        if receive <= STARTING_B {
            prop_assert!(result.is_ok());
            prop_assert_eq!(w.balance(&w.taker.pubkey(), &w.mint_a), deposit);
            prop_assert_eq!(w.balance(&w.maker.pubkey(), &w.mint_b), receive);
            prop_assert!(w.ledger.escrow_record(&w.escrow(seed)).is_none());
        } else {
            prop_assert_eq!(
                program_error(result),
                EscrowError::InsufficientFunds { required: receive, available: STARTING_B }
            );
            prop_assert_eq!(w.ledger.token_balance(&w.vault(seed)), Some(deposit));
        }
        prop_assert_eq!(w.ledger.token_supply(&w.mint_a), supply_a);
        prop_assert_eq!(w.ledger.token_supply(&w.mint_b), supply_b);
    }

    #[test]
    fn prop_refund_restores_maker(
        seed in any::<u64>(),
        deposit in 1u64..=STARTING_A,
        receive in 1u64..=u64::MAX,
    ) {
        let w = World::new();
        let lamports = w.ledger.lamports(&w.maker.pubkey());
        w.make(seed, deposit, receive).unwrap();
        w.refund(seed).unwrap();
        prop_assert_eq!(w.balance(&w.maker.pubkey(), &w.mint_a), STARTING_A);
        prop_assert_eq!(w.ledger.lamports(&w.maker.pubkey()), lamports);
        prop_assert!(w.ledger.account(&w.vault(seed)).is_none());
    }
}
