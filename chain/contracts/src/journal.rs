//! Commit journal: state roots of committed transactions
//!
//! Every committed transaction appends one entry carrying the SHA-256
//! state root of the whole ledger after its write-set landed. Failed
//! transactions append nothing, so the root sequence only ever moves on
//! a successful commit.

use chrono::{DateTime, Utc};
use escrow_types::account::Account;
use escrow_types::pubkey::Pubkey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::events::EscrowEvent;

/// One committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// 1-based commit sequence number
    pub sequence: u64,
    pub message_hash: [u8; 32],
    /// Ledger state root after this commit
    pub state_root: [u8; 32],
    pub committed_at: DateTime<Utc>,
    pub events: Vec<EscrowEvent>,
}

/// SHA-256 over every account in ascending key order.
///
/// Callers must pass accounts sorted by key; the ledger does so.
pub fn state_root<'a>(accounts: impl IntoIterator<Item = (&'a Pubkey, &'a Account)>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for (key, account) in accounts {
        hasher.update(key.as_ref());
        hasher.update(account.lamports.to_le_bytes());
        hasher.update(account.owner.as_ref());
        hasher.update((account.data.len() as u64).to_le_bytes());
        hasher.update(&account.data);
    }
    hasher.finalize().into()
}
