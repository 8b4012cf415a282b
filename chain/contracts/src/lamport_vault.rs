//! Lamport vault program
//!
//! Each owner gets one holding account for native lamports at
//! `derive("vault", owner)` under the vault program. The vault is a plain
//! system account with no data. Only its owner can fill it, and only this
//! program, signing as the derived address, can empty it back to the owner.
//!
//! Data layout: one discriminator byte (`deposit = 0`, `withdraw = 1`),
//! followed for `deposit` by the amount as little-endian u64.
//!
//! Accounts, for both instructions:
//! 0. `[signer, writable]` owner
//! 1. `[writable]` vault
//! 2. `[]` system program

use escrow_types::pubkey::Pubkey;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{RuntimeConfig, SYSTEM_PROGRAM_ID};
use crate::context::InvokeContext;
use crate::errors::{EscrowError, PdaError};
use crate::events::{EscrowEvent, VaultDeposited, VaultWithdrawn};
use crate::pda;
use crate::transaction::{AccountMeta, Instruction};

/// Namespace tag of vault addresses.
pub const VAULT_SEED: &[u8] = b"vault";

const OWNER: usize = 0;
const VAULT: usize = 1;
const SYSTEM_PROGRAM: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultInstruction {
    /// Fund an empty vault with more than the rent-exempt minimum.
    Deposit { amount: u64 },
    /// Return the vault's whole balance to its owner.
    Withdraw,
}

impl VaultInstruction {
    const DEPOSIT: u8 = 0;
    const WITHDRAW: u8 = 1;

    pub fn pack(&self) -> Vec<u8> {
        match self {
            Self::Deposit { amount } => {
                let mut buf = Vec::with_capacity(9);
                buf.push(Self::DEPOSIT);
                buf.extend_from_slice(&amount.to_le_bytes());
                buf
            }
            Self::Withdraw => vec![Self::WITHDRAW],
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, EscrowError> {
        let (&tag, rest) = data
            .split_first()
            .ok_or(EscrowError::InvalidInstructionData)?;
        match tag {
            Self::DEPOSIT => {
                let bytes: [u8; 8] = rest
                    .try_into()
                    .map_err(|_| EscrowError::InvalidInstructionData)?;
                Ok(Self::Deposit {
                    amount: u64::from_le_bytes(bytes),
                })
            }
            Self::WITHDRAW if rest.is_empty() => Ok(Self::Withdraw),
            _ => Err(EscrowError::InvalidInstructionData),
        }
    }
}

/// Vault address and bump for `owner`.
pub fn find_vault_address(owner: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    pda::find_program_address(&[VAULT_SEED, owner.as_ref()], program_id)
}

fn accounts(config: &RuntimeConfig, owner: &Pubkey) -> Result<Vec<AccountMeta>, PdaError> {
    let (vault, _) = find_vault_address(owner, &config.vault_program_id)?;
    Ok(vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
    ])
}

/// Build a `deposit` instruction for `owner`'s vault.
pub fn deposit(
    config: &RuntimeConfig,
    owner: &Pubkey,
    amount: u64,
) -> Result<Instruction, PdaError> {
    Ok(Instruction {
        program_id: config.vault_program_id,
        accounts: accounts(config, owner)?,
        data: VaultInstruction::Deposit { amount }.pack(),
    })
}

/// Build a `withdraw` instruction for `owner`'s vault.
pub fn withdraw(config: &RuntimeConfig, owner: &Pubkey) -> Result<Instruction, PdaError> {
    Ok(Instruction {
        program_id: config.vault_program_id,
        accounts: accounts(config, owner)?,
        data: VaultInstruction::Withdraw.pack(),
    })
}

/// Vault program entrypoint.
pub fn process_instruction(ctx: &mut InvokeContext<'_>, data: &[u8]) -> Result<(), EscrowError> {
    match VaultInstruction::unpack(data)? {
        VaultInstruction::Deposit { amount } => process_deposit(ctx, amount),
        VaultInstruction::Withdraw => process_withdraw(ctx),
    }
}

/// Signed owner, and a vault at the owner's derived address.
fn check_accounts(ctx: &InvokeContext<'_>) -> Result<(Pubkey, Pubkey, u8), EscrowError> {
    if !ctx.is_signer(OWNER) {
        return Err(EscrowError::Unauthorized);
    }
    ctx.require_program(SYSTEM_PROGRAM, &SYSTEM_PROGRAM_ID)?;

    let owner = ctx.key(OWNER)?;
    let vault = ctx.key(VAULT)?;
    let (expected, bump) = find_vault_address(&owner, ctx.program_id())?;
    if vault != expected {
        return Err(EscrowError::InvalidSeeds);
    }
    Ok((owner, vault, bump))
}

fn process_deposit(ctx: &mut InvokeContext<'_>, amount: u64) -> Result<(), EscrowError> {
    let (owner, vault, _) = check_accounts(ctx)?;
    if ctx.account(VAULT)?.lamports != 0 {
        return Err(EscrowError::VaultAlreadyExists);
    }
    if amount <= ctx.rent().minimum_balance(0) {
        return Err(EscrowError::InvalidAmount);
    }

    ctx.transfer_lamports(OWNER, VAULT, amount, None)?;

    ctx.emit(EscrowEvent::Deposited(VaultDeposited { vault, owner, amount }));
    info!(%vault, %owner, amount, "Vault funded");
    Ok(())
}

fn process_withdraw(ctx: &mut InvokeContext<'_>) -> Result<(), EscrowError> {
    let (owner, vault, bump) = check_accounts(ctx)?;
    let amount = ctx.account(VAULT)?.lamports;
    if amount == 0 {
        return Err(EscrowError::InvalidAmount);
    }

    let signer = ctx.derive_signer(&[VAULT_SEED, owner.as_ref(), &[bump]])?;
    ctx.transfer_lamports(VAULT, OWNER, amount, Some(&signer))?;

    ctx.emit(EscrowEvent::Withdrawn(VaultWithdrawn { vault, owner, amount }));
    info!(%vault, %owner, amount, "Vault drained");
    Ok(())
}
