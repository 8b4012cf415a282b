//! Shared fixture for escrow integration tests

#![allow(dead_code)]

use escrow_contracts::errors::{EscrowError, TransactionError};
use escrow_contracts::instruction;
use escrow_contracts::ledger::{Ledger, TransactionReceipt};
use escrow_contracts::state::EscrowRecord;
use escrow_contracts::token::associated_token_address;
use escrow_contracts::transaction::{Instruction, Transaction};
use escrow_contracts::vault::vault_address;
use escrow_types::pubkey::Pubkey;
use escrow_types::signer::Keypair;
use std::sync::atomic::{AtomicU64, Ordering};

pub const SOL: u64 = 1_000_000_000;
pub const DECIMALS: u8 = 6;
pub const STARTING_A: u64 = 1_000;
pub const STARTING_B: u64 = 1_000;

static NONCE: AtomicU64 = AtomicU64::new(0);

pub struct World {
    pub ledger: Ledger,
    pub maker: Keypair,
    pub taker: Keypair,
    pub authority: Keypair,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub maker_ata_a: Pubkey,
    pub taker_ata_b: Pubkey,
}

impl World {
    /// Maker holds 1000 A, taker holds 1000 B, both hold 10 SOL.
    pub fn new() -> Self {
        let ledger = Ledger::with_defaults();
        let maker = Keypair::new();
        let taker = Keypair::new();
        let authority = Keypair::new();
        ledger.airdrop(&maker.pubkey(), 10 * SOL).unwrap();
        ledger.airdrop(&taker.pubkey(), 10 * SOL).unwrap();

        let mint_a = ledger.create_mint(&authority.pubkey(), DECIMALS);
        let mint_b = ledger.create_mint(&authority.pubkey(), DECIMALS);
        let maker_ata_a = ledger.create_token_account(&maker.pubkey(), &mint_a).unwrap();
        let taker_ata_b = ledger.create_token_account(&taker.pubkey(), &mint_b).unwrap();
        ledger.mint_to(&mint_a, &maker_ata_a, &authority, STARTING_A).unwrap();
        ledger.mint_to(&mint_b, &taker_ata_b, &authority, STARTING_B).unwrap();

        Self {
            ledger,
            maker,
            taker,
            authority,
            mint_a,
            mint_b,
            maker_ata_a,
            taker_ata_b,
        }
    }

    pub fn send(
        &self,
        ix: Instruction,
        signers: &[&Keypair],
    ) -> Result<TransactionReceipt, TransactionError> {
        let tx = Transaction::new_signed(vec![ix], NONCE.fetch_add(1, Ordering::Relaxed), signers);
        self.ledger.process_transaction(&tx)
    }

    pub fn escrow(&self, seed: u64) -> Pubkey {
        let program_id = self.ledger.config().escrow_program_id;
        EscrowRecord::find_address(&self.maker.pubkey(), seed, &program_id)
            .unwrap()
            .0
    }

    pub fn vault(&self, seed: u64) -> Pubkey {
        vault_address(&self.escrow(seed), &self.mint_a, self.ledger.config()).unwrap()
    }

    pub fn ata(&self, wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
        associated_token_address(wallet, mint, self.ledger.config()).unwrap()
    }

    /// Token balance, zero when the account does not exist.
    pub fn balance(&self, wallet: &Pubkey, mint: &Pubkey) -> u64 {
        self.ledger.token_balance(&self.ata(wallet, mint)).unwrap_or(0)
    }

    pub fn make(
        &self,
        seed: u64,
        deposit: u64,
        receive: u64,
    ) -> Result<TransactionReceipt, TransactionError> {
        let ix = instruction::make(
            self.ledger.config(),
            &self.maker.pubkey(),
            &self.mint_a,
            &self.mint_b,
            seed,
            deposit,
            receive,
        )
        .unwrap();
        self.send(ix, &[&self.maker])
    }

    pub fn take(&self, seed: u64) -> Result<TransactionReceipt, TransactionError> {
        let ix = instruction::take(
            self.ledger.config(),
            &self.taker.pubkey(),
            &self.maker.pubkey(),
            &self.escrow(seed),
            &self.mint_a,
            &self.mint_b,
        )
        .unwrap();
        self.send(ix, &[&self.taker])
    }

    pub fn refund(&self, seed: u64) -> Result<TransactionReceipt, TransactionError> {
        let ix = instruction::refund(
            self.ledger.config(),
            &self.maker.pubkey(),
            &self.escrow(seed),
            &self.mint_a,
        )
        .unwrap();
        self.send(ix, &[&self.maker])
    }
}

/// The program error carried by a failed transaction.
pub fn program_error(result: Result<TransactionReceipt, TransactionError>) -> EscrowError {
    match result {
        Err(TransactionError::InstructionError { error, .. }) => error,
        other => panic!("expected an instruction error, got {other:?}"),
    }
}
