//! Ledger: in-process host for the escrow and lamport vault programs
//!
//! Transactions execute against a staged copy of the accounts they
//! reference and commit all-or-nothing:
//!
//! 1. Signature verification and replay check
//! 2. Account locks (fail fast with `AccountInUse` on overlap)
//! 3. Snapshot of the referenced accounts into a write-set
//! 4. Instruction execution against the write-set
//! 5. Post-checks: lamports conserved, read-only accounts untouched
//! 6. Commit under one write lock, purge of zero-lamport accounts, journal
//!
//! Transactions with disjoint account sets run concurrently; steps 3-5
//! hold no ledger-wide lock.

use escrow_types::account::Account;
use escrow_types::pubkey::Pubkey;
use escrow_types::signer::Keypair;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::config::{RuntimeConfig, SYSTEM_PROGRAM_ID};
use crate::context::{InvokeContext, TransactionAccount};
use crate::errors::{EscrowError, TokenError, TransactionError};
use crate::events::EscrowEvent;
use crate::journal::{self, JournalEntry};
use crate::lamport_vault;
use crate::processor;
use crate::security::{AccountLocks, ProcessedSignatures};
use crate::state::EscrowRecord;
use crate::token::{self, Mint, TokenAccount};
use crate::transaction::{Transaction, TransactionKey};

/// A hosted program's instruction handler.
type Entrypoint = fn(&mut InvokeContext<'_>, &[u8]) -> Result<(), EscrowError>;

/// Outcome of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub sequence: u64,
    pub message_hash: [u8; 32],
    pub state_root: [u8; 32],
    pub events: Vec<EscrowEvent>,
    /// Balance of every token account in the write-set after commit
    pub post_token_balances: BTreeMap<Pubkey, u64>,
    /// Accounts that existed before the transaction and were removed by it
    pub closed_accounts: Vec<Pubkey>,
}

pub struct Ledger {
    config: RuntimeConfig,
    accounts: RwLock<HashMap<Pubkey, Account>>,
    locks: AccountLocks,
    processed: Mutex<ProcessedSignatures>,
    journal: Mutex<Vec<JournalEntry>>,
}

impl Ledger {
    pub fn new(config: RuntimeConfig) -> Self {
        let processed = ProcessedSignatures::new(config.replay_window);
        Self {
            config,
            accounts: RwLock::new(HashMap::new()),
            locks: AccountLocks::new(),
            processed: Mutex::new(processed),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RuntimeConfig::default())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ───────────────────────── Genesis setup ─────────────────────────
    //
    // These write directly to storage, outside transaction locking. Use
    // them before submitting transactions that touch the same accounts.

    /// Credit `lamports` to `to`, creating a system account if needed.
    pub fn airdrop(&self, to: &Pubkey, lamports: u64) -> Result<(), TransactionError> {
        let mut accounts = self.accounts_write();
        let account = accounts
            .entry(*to)
            .or_insert_with(|| Account::new(0, 0, SYSTEM_PROGRAM_ID));
        account.lamports = account
            .lamports
            .checked_add(lamports)
            .ok_or(TransactionError::Overflow)?;
        debug!(%to, lamports, "Airdrop");
        Ok(())
    }

    /// Create a rent-exempt mint with `authority` and return its address.
    pub fn create_mint(&self, authority: &Pubkey, decimals: u8) -> Pubkey {
        let address = Pubkey::new_unique();
        let mut account = Account::new(
            self.config.rent.minimum_balance(Mint::LEN),
            Mint::LEN,
            self.config.token_program_id,
        );
        account.data = Mint {
            mint_authority: Some(*authority),
            supply: 0,
            decimals,
        }
        .pack();
        self.accounts_write().insert(address, account);
        debug!(%address, decimals, "Mint created");
        address
    }

    /// Create the associated token account of `(wallet, mint)` if missing
    /// and return its address.
    pub fn create_token_account(
        &self,
        wallet: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, TransactionError> {
        let address = token::associated_token_address(wallet, mint, &self.config)?;
        let mut accounts = self.accounts_write();
        if !accounts.contains_key(mint) {
            return Err(TransactionError::AccountNotFound(*mint));
        }
        if accounts.contains_key(&address) {
            return Ok(address);
        }
        let mut account = Account::new(
            self.config.rent.minimum_balance(TokenAccount::LEN),
            TokenAccount::LEN,
            self.config.token_program_id,
        );
        account.data = TokenAccount {
            mint: *mint,
            owner: *wallet,
            amount: 0,
        }
        .pack();
        accounts.insert(address, account);
        Ok(address)
    }

    /// Issue `amount` new units of `mint` into the token account `to`.
    /// `authority` must be the mint authority.
    pub fn mint_to(
        &self,
        mint: &Pubkey,
        to: &Pubkey,
        authority: &Keypair,
        amount: u64,
    ) -> Result<(), TransactionError> {
        let mut accounts = self.accounts_write();
        let mint_account = accounts
            .get(mint)
            .ok_or(TransactionError::AccountNotFound(*mint))?;
        let mut mint_state = self.owned_state(mint_account, Mint::unpack)?;
        if mint_state.mint_authority != Some(authority.pubkey()) {
            return Err(TokenError::OwnerMismatch.into());
        }

        let destination = accounts.get(to).ok_or(TransactionError::AccountNotFound(*to))?;
        let mut balance = self.owned_state(destination, TokenAccount::unpack)?;
        if balance.mint != *mint {
            return Err(TokenError::MintMismatch.into());
        }

        mint_state.supply = mint_state.supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        balance.amount = balance.amount.checked_add(amount).ok_or(TokenError::Overflow)?;
        if let Some(account) = accounts.get_mut(mint) {
            account.data = mint_state.pack();
        }
        if let Some(account) = accounts.get_mut(to) {
            account.data = balance.pack();
        }
        debug!(%mint, %to, amount, "Minted");
        Ok(())
    }

    fn owned_state<T>(
        &self,
        account: &Account,
        unpack: fn(&[u8]) -> Result<T, TokenError>,
    ) -> Result<T, TransactionError> {
        if !account.is_owned_by(&self.config.token_program_id) {
            return Err(TokenError::InvalidAccountData.into());
        }
        Ok(unpack(&account.data)?)
    }

    // ───────────────────────── Reads ─────────────────────────

    /// The account at `key`, if it exists.
    pub fn account(&self, key: &Pubkey) -> Option<Account> {
        self.accounts_read().get(key).cloned()
    }

    pub fn lamports(&self, key: &Pubkey) -> u64 {
        self.accounts_read().get(key).map_or(0, |a| a.lamports)
    }

    /// Balance of the token account at `key`.
    pub fn token_balance(&self, key: &Pubkey) -> Option<u64> {
        let account = self.account(key)?;
        self.owned_state(&account, TokenAccount::unpack).ok().map(|t| t.amount)
    }

    /// Total issued supply of `mint`.
    pub fn token_supply(&self, mint: &Pubkey) -> Option<u64> {
        let account = self.account(mint)?;
        self.owned_state(&account, Mint::unpack).ok().map(|m| m.supply)
    }

    /// The escrow record stored at `key`.
    pub fn escrow_record(&self, key: &Pubkey) -> Option<EscrowRecord> {
        let account = self.account(key)?;
        if !account.is_owned_by(&self.config.escrow_program_id) {
            return None;
        }
        EscrowRecord::unpack(&account.data).ok()
    }

    /// Keys of every live account owned by `program_id`, sorted.
    pub fn accounts_owned_by(&self, program_id: &Pubkey) -> Vec<Pubkey> {
        let mut keys: Vec<Pubkey> = self
            .accounts_read()
            .iter()
            .filter(|(_, account)| account.is_owned_by(program_id))
            .map(|(key, _)| *key)
            .collect();
        keys.sort();
        keys
    }

    /// SHA-256 over all accounts in key order.
    pub fn state_root(&self) -> [u8; 32] {
        compute_root(&self.accounts_read())
    }

    /// Committed transactions, oldest first.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn transaction_count(&self) -> usize {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    // ───────────────────────── Execution ─────────────────────────

    /// Execute `tx` atomically. On error nothing is written.
    pub fn process_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<TransactionReceipt, TransactionError> {
        if tx.instructions.is_empty() {
            return Err(TransactionError::EmptyTransaction);
        }
        let message_hash = tx.message_hash();
        tx.verify_signatures()?;
        if self.processed_lock().contains(&message_hash) {
            return Err(TransactionError::AlreadyProcessed);
        }

        let keys = tx.account_keys();
        if keys.len() > self.config.max_transaction_accounts {
            return Err(TransactionError::TooManyAccounts {
                count: keys.len(),
                limit: self.config.max_transaction_accounts,
            });
        }
        let _guard = self.locks.try_lock(&keys)?;

        let mut store = self.snapshot(&keys);
        let before = store.clone();
        let mut events = Vec::new();

        for (index, ix) in tx.instructions.iter().enumerate() {
            let entrypoint = self
                .entrypoint(&ix.program_id)
                .ok_or(TransactionError::InstructionError {
                    index,
                    error: EscrowError::IncorrectProgramId,
                })?;
            let metas = ix
                .accounts
                .iter()
                .map(|meta| {
                    keys.iter()
                        .position(|k| k.pubkey == meta.pubkey)
                        .map(|i| (i, meta.is_signer, meta.is_writable))
                        .ok_or(TransactionError::AccountNotFound(meta.pubkey))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut ctx =
                InvokeContext::new(&self.config, ix.program_id, &metas, &mut store, &mut events);
            entrypoint(&mut ctx, &ix.data).map_err(|error| {
                warn!(index, %error, "Instruction failed");
                TransactionError::InstructionError { index, error }
            })?;
        }

        verify_post_state(&keys, &before, &store)?;
        let post_token_balances = self.token_balances(&store);
        self.commit(message_hash, store, events, post_token_balances)
    }

    fn entrypoint(&self, program_id: &Pubkey) -> Option<Entrypoint> {
        if *program_id == self.config.escrow_program_id {
            Some(processor::process_instruction)
        } else if *program_id == self.config.vault_program_id {
            Some(lamport_vault::process_instruction)
        } else {
            None
        }
    }

    fn snapshot(&self, keys: &[TransactionKey]) -> Vec<TransactionAccount> {
        let accounts = self.accounts_read();
        keys.iter()
            .map(|k| TransactionAccount {
                key: k.pubkey,
                account: accounts.get(&k.pubkey).cloned().unwrap_or_default(),
            })
            .collect()
    }

    fn token_balances(&self, store: &[TransactionAccount]) -> BTreeMap<Pubkey, u64> {
        store
            .iter()
            .filter(|entry| entry.account.exists())
            .filter_map(|entry| {
                self.owned_state(&entry.account, TokenAccount::unpack)
                    .ok()
                    .map(|state| (entry.key, state.amount))
            })
            .collect()
    }

    fn commit(
        &self,
        message_hash: [u8; 32],
        store: Vec<TransactionAccount>,
        events: Vec<EscrowEvent>,
        post_token_balances: BTreeMap<Pubkey, u64>,
    ) -> Result<TransactionReceipt, TransactionError> {
        let mut accounts = self.accounts_write();
        // a concurrent duplicate may have committed after the early check
        if !self.processed_lock().insert(message_hash) {
            return Err(TransactionError::AlreadyProcessed);
        }

        let mut closed_accounts = Vec::new();
        for TransactionAccount { key, account } in store {
            if account.exists() {
                accounts.insert(key, account);
            } else if accounts.remove(&key).is_some() {
                closed_accounts.push(key);
            }
        }
        let state_root = compute_root(&accounts);

        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = journal.len() as u64 + 1;
        journal.push(JournalEntry {
            sequence,
            message_hash,
            state_root,
            committed_at: chrono::Utc::now(),
            events: events.clone(),
        });

        info!(
            sequence,
            events = events.len(),
            closed = closed_accounts.len(),
            "Transaction committed"
        );
        Ok(TransactionReceipt {
            sequence,
            message_hash,
            state_root,
            events,
            post_token_balances,
            closed_accounts,
        })
    }

    fn accounts_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Pubkey, Account>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn accounts_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Pubkey, Account>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn processed_lock(&self) -> std::sync::MutexGuard<'_, ProcessedSignatures> {
        self.processed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn compute_root(accounts: &HashMap<Pubkey, Account>) -> [u8; 32] {
    let mut sorted: Vec<(&Pubkey, &Account)> = accounts.iter().collect();
    sorted.sort_by_key(|(key, _)| **key);
    journal::state_root(sorted)
}

fn verify_post_state(
    keys: &[TransactionKey],
    before: &[TransactionAccount],
    after: &[TransactionAccount],
) -> Result<(), TransactionError> {
    let total = |set: &[TransactionAccount]| -> u128 {
        set.iter().map(|entry| u128::from(entry.account.lamports)).sum()
    };
    let (before_total, after_total) = (total(before), total(after));
    if before_total != after_total {
        return Err(TransactionError::UnbalancedTransaction {
            before: before_total,
            after: after_total,
        });
    }

    for ((key, old), new) in keys.iter().zip(before).zip(after) {
        if !key.is_writable && old.account != new.account {
            return Err(TransactionError::ReadonlyModified(key.pubkey));
        }
    }
    Ok(())
}
