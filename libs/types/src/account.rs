//! Ledger account storage unit
//!
//! Every address on the ledger maps to one `Account`. An account with zero
//! lamports does not exist: the ledger purges it on commit and reads of an
//! unknown address yield `Account::default()`.

use serde::{Deserialize, Serialize};

use crate::pubkey::Pubkey;

/// A ledger account: a lamport balance, the program that owns its data,
/// and the data itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub lamports: u64,
    /// Program allowed to mutate `data`
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

impl Account {
    /// Create an account with zeroed data of length `space`.
    pub fn new(lamports: u64, space: usize, owner: Pubkey) -> Self {
        Self {
            lamports,
            owner,
            data: vec![0u8; space],
        }
    }

    /// Whether the account is live on the ledger.
    pub fn exists(&self) -> bool {
        self.lamports > 0
    }

    /// Whether this account is owned by `program_id`.
    pub fn is_owned_by(&self, program_id: &Pubkey) -> bool {
        self.owner == *program_id
    }
}
