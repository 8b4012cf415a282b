//! Instructions and signed transactions
//!
//! A transaction is an ordered list of instructions plus a nonce, signed by
//! every key any instruction marks as a signer. The canonical message
//! encoding is length-prefixed binary; its SHA-256 is what gets signed and
//! what replay protection remembers.

use escrow_types::pubkey::Pubkey;
use escrow_types::signer::{Keypair, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::TransactionError;

/// One account reference of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A call into one program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A deduplicated account reference across a whole transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionKey {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub instructions: Vec<Instruction>,
    /// Distinguishes otherwise identical transactions
    pub nonce: u64,
    pub signatures: Vec<(Pubkey, Signature)>,
}

impl Transaction {
    /// Build a transaction and sign its message hash with every keypair.
    pub fn new_signed(instructions: Vec<Instruction>, nonce: u64, signers: &[&Keypair]) -> Self {
        let mut tx = Self {
            instructions,
            nonce,
            signatures: Vec::with_capacity(signers.len()),
        };
        let hash = tx.message_hash();
        tx.signatures = signers
            .iter()
            .map(|keypair| (keypair.pubkey(), keypair.sign_message(&hash)))
            .collect();
        tx
    }

    /// Canonical message bytes.
    pub fn message_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(&(self.instructions.len() as u32).to_le_bytes());
        for ix in &self.instructions {
            buf.extend_from_slice(ix.program_id.as_ref());
            buf.extend_from_slice(&(ix.accounts.len() as u32).to_le_bytes());
            for meta in &ix.accounts {
                buf.extend_from_slice(meta.pubkey.as_ref());
                buf.push(u8::from(meta.is_signer) | (u8::from(meta.is_writable) << 1));
            }
            buf.extend_from_slice(&(ix.data.len() as u32).to_le_bytes());
            buf.extend_from_slice(&ix.data);
        }
        buf
    }

    /// SHA-256 of the canonical message bytes.
    pub fn message_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.message_bytes());
        hasher.finalize().into()
    }

    /// Every key marked as a signer must carry a valid signature over the
    /// message hash.
    pub fn verify_signatures(&self) -> Result<(), TransactionError> {
        let hash = self.message_hash();
        for key in self.account_keys() {
            if !key.is_signer {
                continue;
            }
            let valid = self
                .signatures
                .iter()
                .any(|(signer, signature)| {
                    *signer == key.pubkey && signature.verify(signer, &hash)
                });
            if !valid {
                return Err(TransactionError::SignatureFailure(key.pubkey));
            }
        }
        Ok(())
    }

    /// Distinct keys referenced by the transaction, in first-use order.
    ///
    /// Privileges are the union over every reference. Program ids appear
    /// read-only.
    pub fn account_keys(&self) -> Vec<TransactionKey> {
        let mut keys: Vec<TransactionKey> = Vec::new();
        let mut merge = |pubkey: Pubkey, is_signer: bool, is_writable: bool| {
            match keys.iter_mut().find(|k| k.pubkey == pubkey) {
                Some(existing) => {
                    existing.is_signer |= is_signer;
                    existing.is_writable |= is_writable;
                }
                None => keys.push(TransactionKey {
                    pubkey,
                    is_signer,
                    is_writable,
                }),
            }
        };
        for ix in &self.instructions {
            for meta in &ix.accounts {
                merge(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            merge(ix.program_id, false, false);
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction(signer: Pubkey) -> Instruction {
        Instruction {
            program_id: Pubkey::new_from_array([0x22; 32]),
            accounts: vec![
                AccountMeta::new(signer, true),
                AccountMeta::new_readonly(Pubkey::new_from_array([7; 32]), false),
            ],
            data: vec![1],
        }
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let keypair = Keypair::from_seed([1; 32]);
        let tx = Transaction::new_signed(vec![instruction(keypair.pubkey())], 0, &[&keypair]);
        assert!(tx.verify_signatures().is_ok());
    }

    #[test]
    fn test_missing_signature_rejected() {
        let keypair = Keypair::from_seed([1; 32]);
        let tx = Transaction::new_signed(vec![instruction(keypair.pubkey())], 0, &[]);
        assert_eq!(
            tx.verify_signatures(),
            Err(TransactionError::SignatureFailure(keypair.pubkey()))
        );
    }

    #[test]
    fn test_tampered_message_rejected() {
        let keypair = Keypair::from_seed([1; 32]);
        let mut tx = Transaction::new_signed(vec![instruction(keypair.pubkey())], 0, &[&keypair]);
        tx.instructions[0].data = vec![2];
        assert!(tx.verify_signatures().is_err());
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let keypair = Keypair::from_seed([1; 32]);
        let impostor = Keypair::from_seed([2; 32]);
        let tx = Transaction::new_signed(vec![instruction(keypair.pubkey())], 0, &[&impostor]);
        assert_eq!(
            tx.verify_signatures(),
            Err(TransactionError::SignatureFailure(keypair.pubkey()))
        );
    }

    #[test]
    fn test_nonce_changes_hash() {
        let keypair = Keypair::from_seed([1; 32]);
        let a = Transaction::new_signed(vec![instruction(keypair.pubkey())], 0, &[&keypair]);
        let b = Transaction::new_signed(vec![instruction(keypair.pubkey())], 1, &[&keypair]);
        assert_ne!(a.message_hash(), b.message_hash());
    }

    #[test]
    fn test_account_keys_merge_privileges() {
        let key = Pubkey::new_from_array([5; 32]);
        let tx = Transaction {
            instructions: vec![
                Instruction {
                    program_id: Pubkey::new_from_array([0x22; 32]),
                    accounts: vec![AccountMeta::new_readonly(key, false)],
                    data: vec![],
                },
                Instruction {
                    program_id: Pubkey::new_from_array([0x22; 32]),
                    accounts: vec![AccountMeta::new(key, true)],
                    data: vec![],
                },
            ],
            nonce: 0,
            signatures: vec![],
        };
        let keys = tx.account_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].pubkey, key);
        assert!(keys[0].is_signer && keys[0].is_writable);
        assert!(!keys[1].is_writable);
    }
}
