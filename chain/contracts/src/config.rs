//! Runtime configuration
//!
//! Program ids, rent parameters and transaction limits. Every field has a
//! default; `RuntimeConfig::from_json_str` overrides any subset of them.

use escrow_types::pubkey::Pubkey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Owner of every account that carries no program data.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// Default escrow program id.
pub const ESCROW_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0x22; 32]);

/// Default token program id.
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0x06; 32]);

/// Default lamport vault program id.
pub const VAULT_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0x56; 32]);

/// Default associated-token program id.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0x8c; 32]);

/// Bytes of bookkeeping the ledger charges for on top of account data.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Storage-cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rent {
    pub lamports_per_byte_year: u64,
    pub exemption_threshold_years: u64,
}

impl Rent {
    /// Lamports an account of `data_len` bytes must hold to exist.
    pub fn minimum_balance(&self, data_len: usize) -> u64 {
        (ACCOUNT_STORAGE_OVERHEAD + data_len as u64)
            .saturating_mul(self.lamports_per_byte_year)
            .saturating_mul(self.exemption_threshold_years)
    }
}

impl Default for Rent {
    fn default() -> Self {
        Self {
            lamports_per_byte_year: 3_480,
            exemption_threshold_years: 2,
        }
    }
}

/// Configuration for a `Ledger` and the programs it hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub escrow_program_id: Pubkey,
    pub vault_program_id: Pubkey,
    pub token_program_id: Pubkey,
    pub associated_token_program_id: Pubkey,
    pub rent: Rent,
    /// Upper bound on distinct accounts one transaction may reference.
    pub max_transaction_accounts: usize,
    /// Message hashes remembered for replay protection, most recent first.
    pub replay_window: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            escrow_program_id: ESCROW_PROGRAM_ID,
            vault_program_id: VAULT_PROGRAM_ID,
            token_program_id: TOKEN_PROGRAM_ID,
            associated_token_program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
            rent: Rent::default(),
            max_transaction_accounts: 64,
            replay_window: 1 << 20,
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
