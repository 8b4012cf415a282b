//! Workload runner
//!
//! The whole plan (identities, amounts, take/refund choices) is drawn from
//! one seeded ChaCha stream before any thread starts, so a config always
//! produces the same plan. Maker `i` is paired with taker `i` and the pairs
//! are dealt round-robin to worker threads; pairs never share a writable
//! account, so workers contend only on read locks of the mints.

use escrow_contracts::errors::{PdaError, TransactionError};
use escrow_contracts::instruction;
use escrow_contracts::ledger::Ledger;
use escrow_contracts::state::EscrowRecord;
use escrow_contracts::token::TokenAccount;
use escrow_contracts::transaction::{Instruction, Transaction};
use escrow_types::pubkey::Pubkey;
use escrow_types::signer::Keypair;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{SimConfig, SimError};
use crate::export::SimReport;
use crate::metrics::SimMetrics;

const AIRDROP_LAMPORTS: u64 = 100_000_000_000;
const DECIMALS: u8 = 6;

/// One planned offer and how it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    pub seed: u64,
    pub deposit: u64,
    pub receive: u64,
    pub take: bool,
}

/// A maker, its counterparty and their offers.
#[derive(Debug)]
pub struct Pair {
    pub maker: Keypair,
    pub taker: Keypair,
    pub offers: Vec<Offer>,
}

/// Draw the full plan from the configured seed.
pub fn plan(config: &SimConfig) -> (Keypair, Vec<Pair>) {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let authority = Keypair::from_seed(rng.gen());
    let pairs = (0..config.makers)
        .map(|_| {
            let maker = Keypair::from_seed(rng.gen());
            let taker = Keypair::from_seed(rng.gen());
            let offers = (0..config.offers_per_maker)
                .map(|index| Offer {
                    seed: index as u64,
                    deposit: rng.gen_range(1..=config.max_deposit),
                    receive: rng.gen_range(1..=config.max_receive),
                    take: rng.gen_bool(config.take_ratio),
                })
                .collect();
            Pair { maker, taker, offers }
        })
        .collect();
    (authority, pairs)
}

fn total(mut amounts: impl Iterator<Item = u64>) -> Result<u64, SimError> {
    amounts
        .try_fold(0u64, |sum, amount| sum.checked_add(amount))
        .ok_or_else(|| SimError::InvalidConfig("offer amounts overflow u64".into()))
}

/// Fund each pair with exactly what its offers need.
fn fund(
    ledger: &Ledger,
    authority: &Keypair,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    pair: &Pair,
) -> Result<(), SimError> {
    let setup = |e: TransactionError| SimError::Setup(e.to_string());
    let deposits = total(pair.offers.iter().map(|o| o.deposit))?;
    let payments = total(pair.offers.iter().filter(|o| o.take).map(|o| o.receive))?;

    ledger.airdrop(&pair.maker.pubkey(), AIRDROP_LAMPORTS).map_err(setup)?;
    ledger.airdrop(&pair.taker.pubkey(), AIRDROP_LAMPORTS).map_err(setup)?;
    let maker_a = ledger.create_token_account(&pair.maker.pubkey(), mint_a).map_err(setup)?;
    let taker_b = ledger.create_token_account(&pair.taker.pubkey(), mint_b).map_err(setup)?;
    if deposits > 0 {
        ledger.mint_to(mint_a, &maker_a, authority, deposits).map_err(setup)?;
    }
    if payments > 0 {
        ledger.mint_to(mint_b, &taker_b, authority, payments).map_err(setup)?;
    }
    Ok(())
}

struct Worker {
    ledger: Arc<Ledger>,
    mint_a: Pubkey,
    mint_b: Pubkey,
    nonce: u64,
    metrics: SimMetrics,
}

impl Worker {
    fn submit(&mut self, ix: Instruction, signer: &Keypair) -> bool {
        self.nonce += 1;
        let tx = Transaction::new_signed(vec![ix], self.nonce, &[signer]);
        match self.ledger.process_transaction(&tx) {
            Ok(_) => true,
            Err(err) => {
                debug!(%err, "Simulated transaction failed");
                self.metrics.record_failure(&err);
                false
            }
        }
    }

    fn run_pair(&mut self, pair: &Pair) -> Result<(), SimError> {
        let config = self.ledger.config().clone();
        let maker = pair.maker.pubkey();
        let taker = pair.taker.pubkey();
        let pda = |e: PdaError| SimError::Setup(e.to_string());

        let mut opened = Vec::with_capacity(pair.offers.len());
        for offer in &pair.offers {
            let ix = instruction::make(
                &config,
                &maker,
                &self.mint_a,
                &self.mint_b,
                offer.seed,
                offer.deposit,
                offer.receive,
            )
            .map_err(pda)?;
            if self.submit(ix, &pair.maker) {
                self.metrics.makes += 1;
                opened.push(*offer);
            }
        }

        for offer in opened {
            let (escrow, _) =
                EscrowRecord::find_address(&maker, offer.seed, &config.escrow_program_id)
                    .map_err(pda)?;
            if offer.take {
                let (mint_a, mint_b) = (&self.mint_a, &self.mint_b);
                let ix = instruction::take(&config, &taker, &maker, &escrow, mint_a, mint_b)
                    .map_err(pda)?;
                if self.submit(ix, &pair.taker) {
                    self.metrics.takes += 1;
                }
            } else {
                let ix = instruction::refund(&config, &maker, &escrow, &self.mint_a).map_err(pda)?;
                if self.submit(ix, &pair.maker) {
                    self.metrics.refunds += 1;
                }
            }
        }
        Ok(())
    }
}

/// Sum of every token account balance of `mint`.
pub fn circulating(ledger: &Ledger, mint: &Pubkey) -> u64 {
    ledger
        .accounts_owned_by(&ledger.config().token_program_id)
        .iter()
        .filter_map(|key| ledger.account(key))
        .filter_map(|account| TokenAccount::unpack(&account.data).ok())
        .filter(|state| state.mint == *mint)
        .map(|state| state.amount)
        .sum()
}

/// Run the workload described by `config`.
pub fn run(config: &SimConfig) -> Result<SimReport, SimError> {
    config.validate()?;
    let started = Instant::now();
    let ledger = Arc::new(Ledger::with_defaults());
    let (authority, pairs) = plan(config);

    let mint_a = ledger.create_mint(&authority.pubkey(), DECIMALS);
    let mint_b = ledger.create_mint(&authority.pubkey(), DECIMALS);
    for pair in &pairs {
        fund(&ledger, &authority, &mint_a, &mint_b, pair)?;
    }
    let supply_a_before = ledger.token_supply(&mint_a).unwrap_or(0);
    let supply_b_before = ledger.token_supply(&mint_b).unwrap_or(0);

    let mut shards: Vec<Vec<Pair>> = (0..config.threads).map(|_| Vec::new()).collect();
    for (index, pair) in pairs.into_iter().enumerate() {
        shards[index % config.threads].push(pair);
    }

    let handles: Vec<_> = shards
        .into_iter()
        .map(|shard| {
            let mut worker = Worker {
                ledger: Arc::clone(&ledger),
                mint_a,
                mint_b,
                nonce: 0,
                metrics: SimMetrics::new(),
            };
            thread::spawn(move || -> Result<SimMetrics, SimError> {
                for pair in &shard {
                    worker.run_pair(pair)?;
                }
                Ok(worker.metrics)
            })
        })
        .collect();

    let mut metrics = SimMetrics::new();
    for handle in handles {
        let shard_metrics = handle.join().map_err(|_| SimError::WorkerPanicked)??;
        metrics.merge(&shard_metrics);
    }

    let report = SimReport {
        version: crate::VERSION.to_string(),
        config: config.clone(),
        supply_a_before,
        supply_a_after: ledger.token_supply(&mint_a).unwrap_or(0),
        supply_b_before,
        supply_b_after: ledger.token_supply(&mint_b).unwrap_or(0),
        circulating_a: circulating(&ledger, &mint_a),
        circulating_b: circulating(&ledger, &mint_b),
        live_records: ledger.accounts_owned_by(&ledger.config().escrow_program_id).len(),
        transactions_committed: ledger.transaction_count(),
        final_state_root: ledger.state_root(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        metrics,
    };
    info!(
        makes = report.metrics.makes,
        takes = report.metrics.takes,
        refunds = report.metrics.refunds,
        failures = report.metrics.failures,
        live_records = report.live_records,
        "Simulation finished"
    );
    Ok(report)
}
