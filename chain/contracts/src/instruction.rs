//! Escrow instruction encoding and client-side builders
//!
//! Data layout: one discriminator byte (`make = 0`, `take = 1`,
//! `refund = 2`), followed for `make` by `seed`, `deposit_amount` and
//! `receive_amount` as little-endian u64.

use escrow_types::pubkey::Pubkey;
use serde::{Deserialize, Serialize};

use crate::config::{RuntimeConfig, SYSTEM_PROGRAM_ID};
use crate::errors::{EscrowError, PdaError};
use crate::state::EscrowRecord;
use crate::token::associated_token_address;
use crate::transaction::{AccountMeta, Instruction};
use crate::vault::vault_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowInstruction {
    /// Open an offer and deposit `deposit_amount` of mint A.
    ///
    /// Accounts:
    /// 0. `[signer, writable]` maker
    /// 1. `[writable]` escrow record
    /// 2. `[]` mint A
    /// 3. `[]` mint B
    /// 4. `[writable]` maker's mint A account
    /// 5. `[writable]` vault
    /// 6. `[]` system program
    /// 7. `[]` token program
    /// 8. `[]` associated token program
    Make {
        seed: u64,
        deposit_amount: u64,
        receive_amount: u64,
    },

    /// Fill an offer.
    ///
    /// Accounts:
    /// 0. `[signer, writable]` taker
    /// 1. `[writable]` maker
    /// 2. `[writable]` escrow record
    /// 3. `[]` mint A
    /// 4. `[]` mint B
    /// 5. `[writable]` vault
    /// 6. `[writable]` taker's mint A account
    /// 7. `[writable]` taker's mint B account
    /// 8. `[writable]` maker's mint B account
    /// 9. `[]` system program
    /// 10. `[]` token program
    /// 11. `[]` associated token program
    Take,

    /// Cancel an offer and return the deposit.
    ///
    /// Accounts:
    /// 0. `[signer, writable]` maker
    /// 1. `[writable]` escrow record
    /// 2. `[]` mint A
    /// 3. `[writable]` vault
    /// 4. `[writable]` maker's mint A account
    /// 5. `[]` system program
    /// 6. `[]` token program
    /// 7. `[]` associated token program
    Refund,
}

impl EscrowInstruction {
    const MAKE: u8 = 0;
    const TAKE: u8 = 1;
    const REFUND: u8 = 2;

    pub fn pack(&self) -> Vec<u8> {
        match self {
            Self::Make {
                seed,
                deposit_amount,
                receive_amount,
            } => {
                let mut buf = Vec::with_capacity(25);
                buf.push(Self::MAKE);
                buf.extend_from_slice(&seed.to_le_bytes());
                buf.extend_from_slice(&deposit_amount.to_le_bytes());
                buf.extend_from_slice(&receive_amount.to_le_bytes());
                buf
            }
            Self::Take => vec![Self::TAKE],
            Self::Refund => vec![Self::REFUND],
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, EscrowError> {
        let (&tag, rest) = data.split_first().ok_or(EscrowError::InvalidInstructionData)?;
        match (tag, rest.len()) {
            (Self::MAKE, 24) => {
                let u64_at = |offset: usize| -> Result<u64, EscrowError> {
                    let bytes: [u8; 8] = rest[offset..offset + 8]
                        .try_into()
                        .map_err(|_| EscrowError::InvalidInstructionData)?;
                    Ok(u64::from_le_bytes(bytes))
                };
                Ok(Self::Make {
                    seed: u64_at(0)?,
                    deposit_amount: u64_at(8)?,
                    receive_amount: u64_at(16)?,
                })
            }
            (Self::TAKE, 0) => Ok(Self::Take),
            (Self::REFUND, 0) => Ok(Self::Refund),
            _ => Err(EscrowError::InvalidInstructionData),
        }
    }
}

fn program_accounts(config: &RuntimeConfig) -> [AccountMeta; 3] {
    [
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        AccountMeta::new_readonly(config.token_program_id, false),
        AccountMeta::new_readonly(config.associated_token_program_id, false),
    ]
}

/// Build a `make` instruction for `(maker, seed)`.
pub fn make(
    config: &RuntimeConfig,
    maker: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    seed: u64,
    deposit_amount: u64,
    receive_amount: u64,
) -> Result<Instruction, PdaError> {
    let (escrow, _) = EscrowRecord::find_address(maker, seed, &config.escrow_program_id)?;
    let mut accounts = vec![
        AccountMeta::new(*maker, true),
        AccountMeta::new(escrow, false),
        AccountMeta::new_readonly(*mint_a, false),
        AccountMeta::new_readonly(*mint_b, false),
        AccountMeta::new(associated_token_address(maker, mint_a, config)?, false),
        AccountMeta::new(vault_address(&escrow, mint_a, config)?, false),
    ];
    accounts.extend(program_accounts(config));

    Ok(Instruction {
        program_id: config.escrow_program_id,
        accounts,
        data: EscrowInstruction::Make {
            seed,
            deposit_amount,
            receive_amount,
        }
        .pack(),
    })
}

/// Build a `take` instruction against the record at `escrow`.
pub fn take(
    config: &RuntimeConfig,
    taker: &Pubkey,
    maker: &Pubkey,
    escrow: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
) -> Result<Instruction, PdaError> {
    let mut accounts = vec![
        AccountMeta::new(*taker, true),
        AccountMeta::new(*maker, false),
        AccountMeta::new(*escrow, false),
        AccountMeta::new_readonly(*mint_a, false),
        AccountMeta::new_readonly(*mint_b, false),
        AccountMeta::new(vault_address(escrow, mint_a, config)?, false),
        AccountMeta::new(associated_token_address(taker, mint_a, config)?, false),
        AccountMeta::new(associated_token_address(taker, mint_b, config)?, false),
        AccountMeta::new(associated_token_address(maker, mint_b, config)?, false),
    ];
    accounts.extend(program_accounts(config));

    Ok(Instruction {
        program_id: config.escrow_program_id,
        accounts,
        data: EscrowInstruction::Take.pack(),
    })
}

/// Build a `refund` instruction against the record at `escrow`.
pub fn refund(
    config: &RuntimeConfig,
    maker: &Pubkey,
    escrow: &Pubkey,
    mint_a: &Pubkey,
) -> Result<Instruction, PdaError> {
    let mut accounts = vec![
        AccountMeta::new(*maker, true),
        AccountMeta::new(*escrow, false),
        AccountMeta::new_readonly(*mint_a, false),
        AccountMeta::new(vault_address(escrow, mint_a, config)?, false),
        AccountMeta::new(associated_token_address(maker, mint_a, config)?, false),
    ];
    accounts.extend(program_accounts(config));

    Ok(Instruction {
        program_id: config.escrow_program_id,
        accounts,
        data: EscrowInstruction::Refund.pack(),
    })
}
