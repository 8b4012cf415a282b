//! Shared security primitives for the ledger
//!
//! Account locks serialize transactions whose account sets overlap, and
//! the processed-signature window rejects replays of recently committed
//! messages.

use escrow_types::pubkey::Pubkey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::errors::TransactionError;
use crate::transaction::TransactionKey;

#[derive(Debug, Default)]
struct LockTable {
    write: HashSet<Pubkey>,
    read: HashMap<Pubkey, usize>,
}

/// Read/write locks over account keys.
///
/// A writable reference needs exclusive access; read-only references may
/// share. Acquisition never waits: a conflict fails the whole request.
#[derive(Debug, Default)]
pub struct AccountLocks {
    table: Mutex<LockTable>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every key, or none of them.
    pub fn try_lock(&self, keys: &[TransactionKey]) -> Result<LockGuard<'_>, TransactionError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        for key in keys {
            let held_for_write = table.write.contains(&key.pubkey);
            let held_for_read = table.read.get(&key.pubkey).map_or(false, |n| *n > 0);
            if held_for_write || (key.is_writable && held_for_read) {
                return Err(TransactionError::AccountInUse(key.pubkey));
            }
        }

        for key in keys {
            if key.is_writable {
                table.write.insert(key.pubkey);
            } else {
                *table.read.entry(key.pubkey).or_insert(0) += 1;
            }
        }

        Ok(LockGuard {
            locks: self,
            keys: keys.to_vec(),
        })
    }

    /// Whether `key` is currently held in any mode.
    #[cfg(test)]
    pub fn is_locked(&self, key: &Pubkey) -> bool {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.write.contains(key) || table.read.contains_key(key)
    }

    fn release(&self, keys: &[TransactionKey]) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            if key.is_writable {
                table.write.remove(&key.pubkey);
            } else if let Some(count) = table.read.get_mut(&key.pubkey) {
                *count -= 1;
                if *count == 0 {
                    table.read.remove(&key.pubkey);
                }
            }
        }
    }
}

/// Held locks; released on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    locks: &'a AccountLocks,
    keys: Vec<TransactionKey>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.keys);
    }
}

/// Message hashes of recently committed transactions, for replay protection.
///
/// Holds at most `capacity` hashes and forgets the oldest beyond that, so
/// memory stays bounded over a long session. A message that has fallen
/// out of the window is no longer recognised as a replay.
#[derive(Debug, Clone)]
pub struct ProcessedSignatures {
    seen: HashSet<[u8; 32]>,
    order: VecDeque<[u8; 32]>,
    capacity: usize,
}

impl ProcessedSignatures {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, message_hash: &[u8; 32]) -> bool {
        self.seen.contains(message_hash)
    }

    /// Record a hash. Returns `false` if it was already present.
    pub fn insert(&mut self, message_hash: [u8; 32]) -> bool {
        if !self.seen.insert(message_hash) {
            return false;
        }
        self.order.push_back(message_hash);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
